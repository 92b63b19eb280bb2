use std::collections::HashMap;

use crate::data::error::QueryError;
use crate::data::model::{CyclingTable, Mode, StepKey};

// ---------------------------------------------------------------------------
// Segment index
// ---------------------------------------------------------------------------

/// One `(cycle, step)` group of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEntry {
    pub key: StepKey,
    /// Mode of the group's first row.
    pub mode: Mode,
    /// Row positions belonging to the group, ascending.
    pub rows: Vec<usize>,
}

/// Steps of a table grouped by cycle, plus ordinal lookups for the nth
/// Charge and nth Discharge step over the whole table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentIndex {
    cycles: Vec<(i32, Vec<StepEntry>)>,
    charges: Vec<StepKey>,
    discharges: Vec<StepKey>,
}

impl SegmentIndex {
    /// Group rows by cycle, then by step, both in order of first appearance.
    pub fn build(table: &CyclingTable) -> Self {
        let cycle_col = table.cycle().values();
        let step_col = table.step().values();
        let modes = table.modes();

        let mut cycles: Vec<(i32, Vec<StepEntry>)> = Vec::new();
        let mut cycle_pos: HashMap<i32, usize> = HashMap::new();
        let mut step_pos: HashMap<StepKey, (usize, usize)> = HashMap::new();

        for row in 0..table.len() {
            let key = StepKey::new(cycle_col[row], step_col[row]);
            if let Some(&(c, s)) = step_pos.get(&key) {
                cycles[c].1[s].rows.push(row);
                continue;
            }
            let c = *cycle_pos.entry(key.cycle).or_insert_with(|| {
                cycles.push((key.cycle, Vec::new()));
                cycles.len() - 1
            });
            let steps = &mut cycles[c].1;
            steps.push(StepEntry {
                key,
                mode: modes[row],
                rows: vec![row],
            });
            step_pos.insert(key, (c, steps.len() - 1));
        }

        let mut charges = Vec::new();
        let mut discharges = Vec::new();
        for entry in cycles.iter().flat_map(|(_, steps)| steps) {
            match entry.mode {
                Mode::Charge => charges.push(entry.key),
                Mode::Discharge => discharges.push(entry.key),
                Mode::Rest => {}
            }
        }

        log::debug!(
            "Segment index: {} cycles, {} charge steps, {} discharge steps",
            cycles.len(),
            charges.len(),
            discharges.len()
        );
        Self {
            cycles,
            charges,
            discharges,
        }
    }

    /// Cycle numbers with their steps, in order of first appearance.
    pub fn cycles(&self) -> &[(i32, Vec<StepEntry>)] {
        &self.cycles
    }

    /// `((cycle, step), mode)` pairs per cycle.
    pub fn steps(&self) -> Vec<Vec<(StepKey, Mode)>> {
        self.cycles
            .iter()
            .map(|(_, steps)| steps.iter().map(|e| (e.key, e.mode)).collect())
            .collect()
    }

    pub fn entry(&self, key: StepKey) -> Option<&StepEntry> {
        self.cycles
            .iter()
            .find(|(cycle, _)| *cycle == key.cycle)?
            .1
            .iter()
            .find(|e| e.key == key)
    }

    /// Number of steps addressable for `mode` (zero for Rest).
    pub fn count(&self, mode: Mode) -> usize {
        match mode {
            Mode::Charge => self.charges.len(),
            Mode::Discharge => self.discharges.len(),
            Mode::Rest => 0,
        }
    }

    /// Key of the `ordinal`-th (1-based) step of `mode` over the whole table.
    ///
    /// Cycles without a step of that mode are not counted.
    pub fn lookup(&self, ordinal: usize, mode: Mode) -> Result<StepKey, QueryError> {
        let keys = match mode {
            Mode::Charge => &self.charges,
            Mode::Discharge => &self.discharges,
            Mode::Rest => return Err(QueryError::RestNotAddressable),
        };
        ordinal
            .checked_sub(1)
            .and_then(|i| keys.get(i))
            .copied()
            .ok_or(QueryError::OrdinalOutOfRange {
                ordinal,
                mode,
                available: keys.len(),
            })
    }
}
