//! Analysis layer: a loaded table plus its step index.
//!
//! ```text
//!   CyclingTable ──► SegmentIndex ──► lookup(n, mode) ──► (cycle, step)
//!        │                                                   │
//!        └────────────── RowFilter / select_rows ◄───────────┘
//!                              │
//!                              ▼
//!                            Curve
//! ```

pub mod curves;
pub mod segment;

use arrow::array::Array;

use crate::data::error::{AnalysisError, QueryError};
use crate::data::filter::{filtered_indices, RowFilter};
use crate::data::model::{CyclingTable, Mode, StepKey};

use curves::{ordinal, Curve, TimeUnit};
use segment::SegmentIndex;

// ---------------------------------------------------------------------------
// Analyser
// ---------------------------------------------------------------------------

/// Owns a table and the segment index derived from it.
pub struct Analyser {
    table: CyclingTable,
    segments: SegmentIndex,
}

impl Analyser {
    pub fn new(table: CyclingTable) -> Self {
        let segments = SegmentIndex::build(&table);
        Self { table, segments }
    }

    pub fn table(&self) -> &CyclingTable {
        &self.table
    }

    pub fn segments(&self) -> &SegmentIndex {
        &self.segments
    }

    /// `((cycle, step), mode)` pairs, grouped per cycle.
    pub fn steps(&self) -> Vec<Vec<(StepKey, Mode)>> {
        self.segments.steps()
    }

    pub fn lookup(&self, ordinal: usize, mode: Mode) -> Result<StepKey, QueryError> {
        self.segments.lookup(ordinal, mode)
    }

    /// Sub-table holding the `ordinal`-th step of `mode`.
    pub fn rows_for(&self, ordinal: usize, mode: Mode) -> Result<CyclingTable, AnalysisError> {
        let key = self.lookup(ordinal, mode)?;
        let rows = filtered_indices(&self.table, &RowFilter::step(key));
        Ok(self.table.select_rows(&rows)?)
    }

    /// Specific capacity against potential for the `ordinal`-th step of
    /// `mode`. Rows without a specific capacity are left out.
    pub fn charge_discharge_curve(&self, n: usize, mode: Mode) -> Result<Curve, QueryError> {
        let key = self.lookup(n, mode)?;
        let capacity = self.table.capacity_mah_per_g();
        let potential = self.table.potential_v().values();
        let points = self
            .segments
            .entry(key)
            .map(|entry| entry.rows.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|&&row| capacity.is_valid(row))
            .map(|&row| [capacity.value(row), potential[row]])
            .collect();

        Ok(Curve {
            name: format!("{} {mode}", ordinal(n)),
            x_label: "Capacity / mAh g-1".to_string(),
            y_label: "Potential / V".to_string(),
            points,
        })
    }

    /// Potential against elapsed time over rows `start..=end`.
    ///
    /// Missing bounds default to the first and last row; `end` is clamped to
    /// the table.
    pub fn potential_by_time(
        &self,
        start: Option<usize>,
        end: Option<usize>,
        unit: TimeUnit,
    ) -> Curve {
        let time = self.table.time_sec().values();
        let potential = self.table.potential_v().values();

        let points = match self.table.len().checked_sub(1) {
            Some(last) => {
                let end = end.map_or(last, |e| e.min(last));
                (start.unwrap_or(0)..=end)
                    .map(|row| [time[row] / unit.divisor(), potential[row]])
                    .collect()
            }
            None => Vec::new(),
        };

        Curve {
            name: "Potential".to_string(),
            x_label: format!("Time / {unit}"),
            y_label: "Potential / V".to_string(),
            points,
        }
    }
}
