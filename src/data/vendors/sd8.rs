//! Hokuto Denko SD8 exports.
//!
//! Shift_JIS CSV with a free-form preamble. The preamble may carry the
//! measurement start time; it ends with the quoted column-title row, which is
//! followed by one units row and then the data rows:
//!
//! ```text
//! 測定開始日時,2023/09/08 10:00:00
//! ...
//! "時間","電圧","電流","電力",...
//! "sec","V","A","W",...
//! 0,3.000,0.001,0.003,0,0,...,1,1,充電
//! ```

use std::path::Path;

use chrono::NaiveDateTime;

use crate::config::LoaderConfig;
use crate::data::builder::TableBuilder;
use crate::data::error::{DataError, Result};
use crate::data::loader::{Vendor, VendorParser};
use crate::data::model::{CyclingRecord, CyclingTable, Mode};
use crate::data::text;

const START_MARKER: &str = "測定開始日時";
const HEADER_MARKER: &str = r#""時間","電圧","電流","電力""#;

// Fixed column positions in the data rows.
const COL_TIME: usize = 0;
const COL_POTENTIAL: usize = 1;
const COL_CAPACITY: usize = 4;
const COL_CAPACITY_PER_G: usize = 5;
const COL_CYCLE: usize = 10;
const COL_STEP: usize = 11;
const COL_MODE: usize = 12;

pub struct Sd8;

impl VendorParser for Sd8 {
    fn vendor(&self) -> Vendor {
        Vendor::Sd8
    }

    fn parse(&self, path: &Path, config: &LoaderConfig) -> Result<CyclingTable> {
        let text = text::read_shift_jis(path)?;
        parse_text(&text, config)
    }
}

/// Position of the column-title row and the start time, if any.
#[derive(Debug, PartialEq)]
struct Preamble {
    header_line: usize,
    started_at: Option<NaiveDateTime>,
}

fn scan_preamble(text: &str, config: &LoaderConfig) -> Result<Preamble> {
    let mut started_at = None;
    for (i, line) in text.lines().enumerate() {
        if line.contains(START_MARKER) {
            let value = line.replacen(&format!("{START_MARKER},"), "", 1);
            started_at = Some(text::parse_datetime(&value, &config.sd8_start_format)?);
        }
        if line.contains(HEADER_MARKER) {
            log::debug!("SD8 header row at line {i}");
            return Ok(Preamble {
                header_line: i,
                started_at,
            });
        }
        if i > config.header_scan_lines {
            break;
        }
    }
    Err(DataError::validation(format!(
        "SD8 header row not found in the first {} lines",
        config.header_scan_lines
    )))
}

pub(crate) fn parse_text(text: &str, config: &LoaderConfig) -> Result<CyclingTable> {
    let preamble = scan_preamble(text, config)?;

    // Skip the title row and the units row below it.
    let data: String = text
        .lines()
        .skip(preamble.header_line + 2)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let mut builder = TableBuilder::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let time_sec = text::parse_f64(record.get(COL_TIME), "time", row)?;
        let mode: Mode = record
            .get(COL_MODE)
            .ok_or_else(|| DataError::validation(format!("row {row}: mode column missing")))?
            .parse()?;
        let datetime = preamble
            .started_at
            .map(|start| text::offset_by_seconds(start, time_sec))
            .transpose()?;

        builder.push(CyclingRecord {
            datetime,
            time_sec,
            potential_v: text::parse_f64(record.get(COL_POTENTIAL), "potential", row)?,
            capacity_mah: text::parse_opt_f64(record.get(COL_CAPACITY), "capacity", row)?,
            capacity_mah_per_g: text::parse_opt_f64(
                record.get(COL_CAPACITY_PER_G),
                "specific capacity",
                row,
            )?,
            cycle: text::parse_i32(record.get(COL_CYCLE), "cycle", row)?,
            step: text::parse_i32(record.get(COL_STEP), "step", row)?,
            mode,
        });
    }
    builder.finish()
}
