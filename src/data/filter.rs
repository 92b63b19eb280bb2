use std::collections::BTreeSet;

use super::model::{CyclingTable, Mode, StepKey};

// ---------------------------------------------------------------------------
// Row predicate over the grouping columns
// ---------------------------------------------------------------------------

/// Per-column selection on `cycle`, `step` and `mode`.
///
/// A column set to `None` is unconstrained. An empty set selects nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub cycles: Option<BTreeSet<i32>>,
    pub steps: Option<BTreeSet<i32>>,
    pub modes: Option<BTreeSet<Mode>>,
}

impl RowFilter {
    /// Rows of a single `(cycle, step)` group.
    pub fn step(key: StepKey) -> Self {
        Self {
            cycles: Some(BTreeSet::from([key.cycle])),
            steps: Some(BTreeSet::from([key.step])),
            modes: None,
        }
    }

    pub fn with_cycles(mut self, cycles: impl IntoIterator<Item = i32>) -> Self {
        self.cycles = Some(cycles.into_iter().collect());
        self
    }

    pub fn with_modes(mut self, modes: impl IntoIterator<Item = Mode>) -> Self {
        self.modes = Some(modes.into_iter().collect());
        self
    }

    fn accepts(&self, cycle: i32, step: i32, mode: Mode) -> bool {
        self.cycles.as_ref().map_or(true, |s| s.contains(&cycle))
            && self.steps.as_ref().map_or(true, |s| s.contains(&step))
            && self.modes.as_ref().map_or(true, |s| s.contains(&mode))
    }
}

/// Return positions of rows passing the filter, in table order.
pub fn filtered_indices(table: &CyclingTable, filter: &RowFilter) -> Vec<usize> {
    let cycles = table.cycle().values();
    let steps = table.step().values();
    table
        .modes()
        .iter()
        .enumerate()
        .filter(|&(i, &mode)| filter.accepts(cycles[i], steps[i], mode))
        .map(|(i, _)| i)
        .collect()
}
