use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array, StringArray, TimestampMillisecondArray};
use arrow::record_batch::RecordBatch;

use super::error::Result;
use super::model::{CyclingRecord, CyclingTable, Mode};
use super::schema::canonical_schema;

// ---------------------------------------------------------------------------
// TableBuilder – accumulate rows, emit one immutable table
// ---------------------------------------------------------------------------

/// Column-wise accumulator for a [`CyclingTable`].
///
/// Parsers compute every derived value per row, push complete records here
/// and call [`finish`](Self::finish) once; the result passes the schema
/// validator before it is handed out.
#[derive(Debug, Default)]
pub struct TableBuilder {
    datetime: Vec<Option<i64>>,
    time_sec: Vec<f64>,
    potential_v: Vec<f64>,
    capacity_mah: Vec<Option<f64>>,
    capacity_mah_per_g: Vec<Option<f64>>,
    cycle: Vec<i32>,
    step: Vec<i32>,
    mode: Vec<&'static str>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(rows: usize) -> Self {
        Self {
            datetime: Vec::with_capacity(rows),
            time_sec: Vec::with_capacity(rows),
            potential_v: Vec::with_capacity(rows),
            capacity_mah: Vec::with_capacity(rows),
            capacity_mah_per_g: Vec::with_capacity(rows),
            cycle: Vec::with_capacity(rows),
            step: Vec::with_capacity(rows),
            mode: Vec::with_capacity(rows),
        }
    }

    pub fn push(&mut self, record: CyclingRecord) {
        self.datetime
            .push(record.datetime.map(|t| t.and_utc().timestamp_millis()));
        self.time_sec.push(record.time_sec);
        self.potential_v.push(record.potential_v);
        self.capacity_mah.push(record.capacity_mah);
        self.capacity_mah_per_g.push(record.capacity_mah_per_g);
        self.cycle.push(record.cycle);
        self.step.push(record.step);
        self.mode.push(record.mode.as_str());
    }

    pub fn len(&self) -> usize {
        self.time_sec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_sec.is_empty()
    }

    /// Build the Arrow batch and run it through the validator.
    pub fn finish(self) -> Result<CyclingTable> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(TimestampMillisecondArray::from(self.datetime)),
            Arc::new(Float64Array::from(self.time_sec)),
            Arc::new(Float64Array::from(self.potential_v)),
            Arc::new(Float64Array::from(self.capacity_mah)),
            Arc::new(Float64Array::from(self.capacity_mah_per_g)),
            Arc::new(Int32Array::from(self.cycle)),
            Arc::new(Int32Array::from(self.step)),
            Arc::new(StringArray::from(self.mode)),
        ];
        let batch = RecordBatch::try_new(canonical_schema(), columns)?;
        CyclingTable::try_from(batch)
    }
}

impl Extend<CyclingRecord> for TableBuilder {
    fn extend<I: IntoIterator<Item = CyclingRecord>>(&mut self, iter: I) {
        for record in iter {
            self.push(record);
        }
    }
}

// ---------------------------------------------------------------------------
// StepCounter – change-detection step numbering
// ---------------------------------------------------------------------------

/// Numbers steps within each cycle.
///
/// The first row of a cycle is step 1; every row whose mode differs from the
/// previous row of the same cycle opens the next step.
#[derive(Debug, Default)]
pub struct StepCounter {
    last: HashMap<i32, (Mode, i32)>,
}

impl StepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step number for the next row of `cycle` with the given mode.
    pub fn next(&mut self, cycle: i32, mode: Mode) -> i32 {
        let entry = self.last.entry(cycle).or_insert((mode, 1));
        if entry.0 != mode {
            *entry = (mode, entry.1 + 1);
        }
        entry.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn record(cycle: i32, step: i32, mode: Mode) -> CyclingRecord {
        CyclingRecord {
            datetime: None,
            time_sec: 0.0,
            potential_v: 3.7,
            capacity_mah: None,
            capacity_mah_per_g: None,
            cycle,
            step,
            mode,
        }
    }

    #[test]
    fn test_step_counter_increments_on_mode_change() {
        let mut steps = StepCounter::new();
        let modes = [
            Mode::Rest,
            Mode::Rest,
            Mode::Charge,
            Mode::Charge,
            Mode::Rest,
            Mode::Discharge,
        ];
        let got: Vec<i32> = modes.iter().map(|&m| steps.next(1, m)).collect();
        assert_eq!(got, vec![1, 1, 2, 2, 3, 4]);
    }

    #[test]
    fn test_step_counter_is_per_cycle() {
        let mut steps = StepCounter::new();
        assert_eq!(steps.next(1, Mode::Charge), 1);
        assert_eq!(steps.next(1, Mode::Discharge), 2);
        assert_eq!(steps.next(2, Mode::Discharge), 1);
        assert_eq!(steps.next(2, Mode::Charge), 2);
        // Revisiting cycle 1 continues from its own last step.
        assert_eq!(steps.next(1, Mode::Discharge), 2);
    }

    #[test]
    fn test_finish_produces_valid_table() {
        let mut builder = TableBuilder::with_capacity(2);
        builder.extend([record(1, 1, Mode::Charge), record(1, 2, Mode::Discharge)]);
        assert_eq!(builder.len(), 2);
        let table = builder.finish().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.batch().schema(), canonical_schema());
        assert_eq!(table.mode().value(1), "Discharge");
        assert_eq!(table.datetime().null_count(), 2);
    }

    #[test]
    fn test_empty_builder_gives_empty_table() {
        let table = TableBuilder::new().finish().unwrap();
        assert!(table.is_empty());
    }
}
