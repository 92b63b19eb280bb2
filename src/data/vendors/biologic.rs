//! Biologic tab-separated exports.
//!
//! The `time/s` column holds absolute timestamps; elapsed time is measured
//! from the first row. Mode comes from the sign of `<I>/mA` and steps are
//! numbered by mode changes within each cycle. Cycles are 0-based in the file.

use std::path::Path;

use crate::config::LoaderConfig;
use crate::data::builder::{StepCounter, TableBuilder};
use crate::data::error::{DataError, Result};
use crate::data::loader::{Vendor, VendorParser};
use crate::data::model::{CyclingRecord, CyclingTable, Mode};
use crate::data::text;

const COL_TIME: &str = "time/s";
const COL_POTENTIAL: &str = "Ewe/V";
const COL_CURRENT: &str = "<I>/mA";
const COL_CAPACITY: &str = "Capacity/mA.h";
const COL_CYCLE: &str = "cycle number";

pub struct Biologic;

impl VendorParser for Biologic {
    fn vendor(&self) -> Vendor {
        Vendor::Biologic
    }

    fn parse(&self, path: &Path, config: &LoaderConfig) -> Result<CyclingTable> {
        let text = text::read_utf8(path)?;
        parse_text(&text, config)
    }
}

struct Columns {
    time: usize,
    potential: usize,
    current: usize,
    capacity: usize,
    cycle: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DataError::validation(format!("Biologic column '{name}' missing")))
        };
        Ok(Self {
            time: find(COL_TIME)?,
            potential: find(COL_POTENTIAL)?,
            current: find(COL_CURRENT)?,
            capacity: find(COL_CAPACITY)?,
            cycle: find(COL_CYCLE)?,
        })
    }
}

pub(crate) fn parse_text(text: &str, config: &LoaderConfig) -> Result<CyclingTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let columns = Columns::locate(reader.headers()?)?;

    let mut builder = TableBuilder::new();
    let mut steps = StepCounter::new();
    let mut start = None;

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let raw_time = record
            .get(columns.time)
            .ok_or_else(|| DataError::validation(format!("row {row}: {COL_TIME} missing")))?;
        let datetime = text::parse_datetime(raw_time, &config.biologic_time_format)?;
        let first = *start.get_or_insert(datetime);

        let current = text::parse_f64(record.get(columns.current), "current", row)?;
        let mode = Mode::from_current(current);
        let raw_cycle = text::parse_i32(record.get(columns.cycle), "cycle", row)?;
        let step = steps.next(raw_cycle, mode);

        builder.push(CyclingRecord {
            datetime: Some(datetime),
            time_sec: text::seconds_between(first, datetime),
            potential_v: text::parse_f64(record.get(columns.potential), "potential", row)?,
            capacity_mah: text::parse_opt_f64(record.get(columns.capacity), "capacity", row)?,
            capacity_mah_per_g: None,
            cycle: raw_cycle + 1,
            step,
            mode,
        });
    }

    if builder.is_empty() {
        return Err(DataError::validation("Biologic file has no data rows"));
    }
    builder.finish()
}
