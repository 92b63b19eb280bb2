use std::fmt;
use std::str::FromStr;

use arrow::array::{
    Array, AsArray, Float64Array, Int32Array, StringArray, TimestampMillisecondArray,
    UInt32Array,
};
use arrow::datatypes::{Float64Type, Int32Type, TimestampMillisecondType};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};

use super::error::{DataError, Result};
use super::schema::{self, Column};
use crate::search::NearestSearch;

// ---------------------------------------------------------------------------
// Mode – electrical state of a sample
// ---------------------------------------------------------------------------

/// Electrical state during a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    Rest,
    Charge,
    Discharge,
}

impl Mode {
    /// All modes in canonical order.
    pub const ALL: [Mode; 3] = [Mode::Rest, Mode::Charge, Mode::Discharge];

    /// Canonical name as stored in the `mode` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Rest => "Rest",
            Mode::Charge => "Charge",
            Mode::Discharge => "Discharge",
        }
    }

    /// Mode implied by the sign of an instantaneous current.
    pub fn from_current(current: f64) -> Mode {
        if current > 0.0 {
            Mode::Charge
        } else if current < 0.0 {
            Mode::Discharge
        } else {
            Mode::Rest
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = DataError;

    /// Accepts the canonical names and the Japanese terms used by
    /// Hokuto Denko instruments.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Rest" | "休止" => Ok(Mode::Rest),
            "Charge" | "充電" => Ok(Mode::Charge),
            "Discharge" | "放電" => Ok(Mode::Discharge),
            other => Err(DataError::validation(format!("unknown mode '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// StepKey – (cycle, step) pair addressing one step group
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepKey {
    pub cycle: i32,
    pub step: i32,
}

impl StepKey {
    pub fn new(cycle: i32, step: i32) -> Self {
        Self { cycle, step }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(cycle {}, step {})", self.cycle, self.step)
    }
}

// ---------------------------------------------------------------------------
// CyclingRecord – one row of the canonical table
// ---------------------------------------------------------------------------

/// A single measurement sample.
#[derive(Debug, Clone, PartialEq)]
pub struct CyclingRecord {
    /// Absolute time, if the source carries a start time.
    pub datetime: Option<NaiveDateTime>,
    /// Seconds since measurement start.
    pub time_sec: f64,
    pub potential_v: f64,
    /// Capacity magnitude; direction is carried by `mode`.
    pub capacity_mah: Option<f64>,
    /// Capacity normalised by active mass, when the source provides it.
    pub capacity_mah_per_g: Option<f64>,
    pub cycle: i32,
    pub step: i32,
    pub mode: Mode,
}

impl CyclingRecord {
    pub fn key(&self) -> StepKey {
        StepKey::new(self.cycle, self.step)
    }
}

// ---------------------------------------------------------------------------
// CyclingTable – the validated canonical table
// ---------------------------------------------------------------------------

/// A schema-checked cycling table backed by an Arrow [`RecordBatch`].
///
/// The only ways to obtain one are [`TryFrom<RecordBatch>`] and
/// [`TableBuilder`](super::builder::TableBuilder), both of which run the
/// schema validator. Columns are stored in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct CyclingTable {
    batch: RecordBatch,
    modes: Vec<Mode>,
}

impl TryFrom<RecordBatch> for CyclingTable {
    type Error = DataError;

    fn try_from(batch: RecordBatch) -> Result<Self> {
        schema::validate(batch.schema_ref())?;

        // Reorder to canonical column order so accessors can index directly.
        let indices = Column::ALL
            .iter()
            .map(|c| batch.schema_ref().index_of(c.name()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let batch = batch.project(&indices)?;
        schema::validate_nulls(&batch)?;

        let modes = schema::validate_modes(batch.column(Column::Mode.index()).as_string::<i32>())?;
        Ok(Self { batch, modes })
    }
}

impl CyclingTable {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    /// Whether the table has no samples.
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// The underlying Arrow batch, in canonical column order.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    pub fn datetime(&self) -> &TimestampMillisecondArray {
        self.batch
            .column(Column::Datetime.index())
            .as_primitive::<TimestampMillisecondType>()
    }

    pub fn time_sec(&self) -> &Float64Array {
        self.float_column(Column::TimeSec)
    }

    pub fn potential_v(&self) -> &Float64Array {
        self.float_column(Column::PotentialV)
    }

    pub fn capacity_mah(&self) -> &Float64Array {
        self.float_column(Column::CapacityMah)
    }

    pub fn capacity_mah_per_g(&self) -> &Float64Array {
        self.float_column(Column::CapacityMahPerG)
    }

    pub fn cycle(&self) -> &Int32Array {
        self.batch
            .column(Column::Cycle.index())
            .as_primitive::<Int32Type>()
    }

    pub fn step(&self) -> &Int32Array {
        self.batch
            .column(Column::Step.index())
            .as_primitive::<Int32Type>()
    }

    pub fn mode(&self) -> &StringArray {
        self.batch.column(Column::Mode.index()).as_string::<i32>()
    }

    /// Parsed modes, one per row.
    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    fn float_column(&self, column: Column) -> &Float64Array {
        self.batch
            .column(column.index())
            .as_primitive::<Float64Type>()
    }

    /// Materialise row `i`. Panics if `i` is out of bounds.
    pub fn record(&self, i: usize) -> CyclingRecord {
        let datetime = self.datetime();
        CyclingRecord {
            datetime: if datetime.is_null(i) {
                None
            } else {
                DateTime::from_timestamp_millis(datetime.value(i)).map(|t| t.naive_utc())
            },
            time_sec: self.time_sec().value(i),
            potential_v: self.potential_v().value(i),
            capacity_mah: nullable(self.capacity_mah(), i),
            capacity_mah_per_g: nullable(self.capacity_mah_per_g(), i),
            cycle: self.cycle().value(i),
            step: self.step().value(i),
            mode: self.modes[i],
        }
    }

    /// Iterate over all rows as [`CyclingRecord`]s.
    pub fn records(&self) -> impl Iterator<Item = CyclingRecord> + '_ {
        (0..self.len()).map(move |i| self.record(i))
    }

    /// Build a new table from the given row positions, in the given order.
    /// Fails if any position is past the end of the table.
    pub fn select_rows(&self, indices: &[usize]) -> Result<CyclingTable> {
        let positions = indices
            .iter()
            .map(|&i| match u32::try_from(i) {
                Ok(pos) if i < self.len() => Ok(pos),
                _ => Err(DataError::validation(format!(
                    "row {i} is out of range for a table of {} rows",
                    self.len()
                ))),
            })
            .collect::<Result<Vec<u32>>>()?;
        let indices = UInt32Array::from(positions);
        let batch = arrow::compute::take_record_batch(&self.batch, &indices)?;
        let modes = indices
            .values()
            .iter()
            .map(|&i| self.modes[i as usize])
            .collect();
        Ok(Self { batch, modes })
    }

    /// Nearest-index search over `time_sec`, labelled by row position.
    pub fn time_search(&self) -> NearestSearch<usize> {
        NearestSearch::from_keys(self.time_sec().values().to_vec())
    }

    /// Nearest-index search over absolute datetimes, labelled by row
    /// position. Rows without a datetime are left out.
    pub fn datetime_search(&self) -> NearestSearch<usize> {
        let (keys, rows): (Vec<f64>, Vec<usize>) = self
            .datetime()
            .iter()
            .enumerate()
            .filter_map(|(row, ms)| ms.map(|ms| (ms as f64 / 1000.0, row)))
            .unzip();
        NearestSearch::from_labelled_keys(keys, rows)
    }
}

fn nullable(array: &Float64Array, i: usize) -> Option<f64> {
    if array.is_null(i) {
        None
    } else {
        Some(array.value(i))
    }
}

impl fmt::Display for CyclingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = arrow::util::pretty::pretty_format_batches(std::slice::from_ref(&self.batch))
            .map_err(|_| fmt::Error)?;
        write!(f, "{table}")
    }
}
