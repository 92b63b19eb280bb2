//! Hokuto Denko HZ7000 session logs (CSV converted from `.SDP` files).
//!
//! A session is a sequence of blocks separated by the phase-header marker.
//! The first block describes the session and must identify it as a
//! charge/discharge measurement. Every following block is one phase and
//! becomes one cycle, numbered by block order:
//!
//! * an open-circuit phase (`自然電位測定`): time and potential only,
//!   a single Rest step;
//! * a main phase (`本測定`): time, potential, current, accumulated charge
//!   and a mode column per row.
//!
//! An analysis section after the last phase is discarded.

use std::path::Path;

use chrono::NaiveDateTime;

use crate::config::LoaderConfig;
use crate::data::builder::{StepCounter, TableBuilder};
use crate::data::error::{DataError, Result};
use crate::data::loader::{Vendor, VendorParser};
use crate::data::model::{CyclingRecord, CyclingTable, Mode};
use crate::data::text;

const PHASE_MARKER: &str = "《測定フェイズヘッダ》";
const ANALYSIS_MARKER: &str = "《解析データヘッダ》";
const SESSION_TAG: &str = "CDC 充放電測定";
const OCV_TAG: &str = "自然電位測定";
const MAIN_TAG: &str = "本測定";
const START_CELL: &str = "開始時間";
const DATA_CELL: &str = "《測定データ》";

/// Coulombs per milliamp-hour.
const COULOMBS_PER_MAH: f64 = 3.6;

// Column positions inside a phase's data rows.
const COL_TIME: usize = 1;
const COL_POTENTIAL: usize = 2;
const COL_CURRENT: usize = 3;
const COL_CHARGE_Q: usize = 5;
const COL_DISCHARGE_Q: usize = 6;
const COL_NET_Q: usize = 7;
const COL_MODE: usize = 8;

pub struct Hz7000;

impl VendorParser for Hz7000 {
    fn vendor(&self) -> Vendor {
        Vendor::Hz7000
    }

    fn parse(&self, path: &Path, config: &LoaderConfig) -> Result<CyclingTable> {
        let text = text::read_shift_jis(path)?;
        parse_text(&text, config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseKind {
    OpenCircuit,
    Main,
}

impl PhaseKind {
    /// Classify a phase block by its title line (the line after the marker).
    fn of(block: &str) -> Option<Self> {
        let title = block.split('\n').nth(1)?;
        if title.contains(OCV_TAG) {
            Some(PhaseKind::OpenCircuit)
        } else if title.contains(MAIN_TAG) {
            Some(PhaseKind::Main)
        } else {
            None
        }
    }
}

/// Split the session into its description block and its phase blocks.
fn split_blocks(text: &str) -> Result<(&str, Vec<&str>)> {
    let mut blocks: Vec<&str> = text.split(PHASE_MARKER).collect();
    let last = blocks.len() - 1;
    let (phase, _analysis) = blocks[last]
        .split_once(ANALYSIS_MARKER)
        .ok_or_else(|| DataError::validation("HZ7000 analysis section not found"))?;
    blocks[last] = phase;

    let session = blocks.remove(0);
    let is_cdc = session
        .split('\n')
        .nth(1)
        .is_some_and(|line| line.contains(SESSION_TAG));
    if !is_cdc {
        return Err(DataError::validation(
            "not an HZ7000 charge/discharge session",
        ));
    }
    Ok((session, blocks))
}

pub(crate) fn parse_text(text: &str, config: &LoaderConfig) -> Result<CyclingTable> {
    let (_, phases) = split_blocks(text)?;

    let mut builder = TableBuilder::new();
    for (i, block) in phases.iter().enumerate() {
        let cycle = i as i32 + 1;
        let Some(kind) = PhaseKind::of(block) else {
            log::warn!("HZ7000 phase {cycle} has an unknown type, skipped");
            continue;
        };
        log::debug!("HZ7000 phase {cycle}: {kind:?}");
        parse_phase(block, kind, cycle, config, &mut builder)?;
    }

    if builder.is_empty() {
        return Err(DataError::validation("HZ7000 session has no measurement data"));
    }
    builder.finish()
}

fn parse_phase(
    block: &str,
    kind: PhaseKind,
    cycle: i32,
    config: &LoaderConfig,
    builder: &mut TableBuilder,
) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(block.as_bytes());

    let mut started_at: Option<NaiveDateTime> = None;
    let mut in_data = false;
    let mut numbers_started = false;
    let mut steps = StepCounter::new();

    for (row, result) in reader.records().enumerate() {
        let fields = result?;
        if fields.iter().all(str::is_empty) {
            continue;
        }

        if !in_data {
            if fields.iter().any(|cell| cell == START_CELL) {
                let raw = fields.get(2).ok_or_else(|| {
                    DataError::validation(format!("phase {cycle}: start time cell missing"))
                })?;
                started_at = Some(text::parse_datetime(raw, &config.hz7000_start_format)?);
            }
            in_data = fields.iter().any(|cell| cell == DATA_CELL);
            continue;
        }

        // Column-title and unit rows sit between the marker and the numbers.
        if !numbers_started {
            if fields.get(COL_TIME).map_or(true, |t| t.parse::<f64>().is_err()) {
                continue;
            }
            numbers_started = true;
        }

        let start = started_at.ok_or_else(|| {
            DataError::validation(format!("phase {cycle}: start time not found"))
        })?;
        let time_sec = text::parse_f64(fields.get(COL_TIME), "time", row)?;
        let potential_v = text::parse_f64(fields.get(COL_POTENTIAL), "potential", row)?;
        let datetime = Some(text::offset_by_seconds(start, time_sec)?);

        let record = match kind {
            PhaseKind::OpenCircuit => CyclingRecord {
                datetime,
                time_sec,
                potential_v,
                capacity_mah: Some(0.0),
                capacity_mah_per_g: Some(0.0),
                cycle,
                step: 1,
                mode: Mode::Rest,
            },
            PhaseKind::Main => {
                // Row-shape check only: a main-phase row carries current and net charge.
                text::parse_f64(fields.get(COL_CURRENT), "current", row)?;
                text::parse_f64(fields.get(COL_NET_Q), "net charge", row)?;
                let mode: Mode = fields
                    .get(COL_MODE)
                    .ok_or_else(|| {
                        DataError::validation(format!("row {row}: mode column missing"))
                    })?
                    .parse()?;
                let capacity_mah = match mode {
                    Mode::Charge => Some(
                        text::parse_f64(fields.get(COL_CHARGE_Q), "+Q", row)?.abs()
                            / COULOMBS_PER_MAH,
                    ),
                    Mode::Discharge => Some(
                        text::parse_f64(fields.get(COL_DISCHARGE_Q), "-Q", row)?.abs()
                            / COULOMBS_PER_MAH,
                    ),
                    Mode::Rest => config.rest_capacity.value(),
                };
                CyclingRecord {
                    datetime,
                    time_sec,
                    potential_v,
                    capacity_mah,
                    capacity_mah_per_g: None,
                    cycle,
                    step: steps.next(cycle, mode),
                    mode,
                }
            }
        };
        builder.push(record);
    }

    if !in_data {
        return Err(DataError::validation(format!(
            "phase {cycle}: data section not found"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestCapacity;
    use crate::data::model::StepKey;
    use crate::data::text::write_shift_jis;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
《ファイルヘッダ》
測定モード,CDC 充放電測定
装置,HZ7000
《測定フェイズヘッダ》
フェイズ,自然電位測定
開始時間,,2023-09-08 10:00:00
《測定データ》
No,時間,電位
,s,V
1,0,3.00
2,10,3.01
《測定フェイズヘッダ》
フェイズ,本測定
開始時間,,2023-09-08 10:01:00
《測定データ》
No,時間,電位,電流,サイクル,+Q,-Q,Q,モード
1,0,3.00,0.001,1,0.0,0.0,0.0,充電
2,10,3.50,0.001,1,36.0,0.0,36.0,充電
3,20,3.40,0,1,36.0,0.0,36.0,休止
4,30,3.00,-0.001,1,36.0,-18.0,18.0,放電

《解析データヘッダ》
解析,なし
";

    fn parse(text: &str) -> Result<CyclingTable> {
        parse_text(text, &LoaderConfig::default())
    }

    #[test]
    fn test_parse_sample() {
        let table = parse(SAMPLE).unwrap();
        assert_eq!(table.len(), 6);

        let keys: Vec<(StepKey, Mode)> = table.records().map(|r| (r.key(), r.mode)).collect();
        assert_eq!(
            keys,
            vec![
                (StepKey::new(1, 1), Mode::Rest),
                (StepKey::new(1, 1), Mode::Rest),
                (StepKey::new(2, 1), Mode::Charge),
                (StepKey::new(2, 1), Mode::Charge),
                (StepKey::new(2, 2), Mode::Rest),
                (StepKey::new(2, 3), Mode::Discharge),
            ]
        );
    }

    #[test]
    fn test_open_circuit_phase_has_zero_capacity() {
        let table = parse(SAMPLE).unwrap();
        let rec = table.record(1);
        assert_eq!(rec.capacity_mah, Some(0.0));
        assert_eq!(rec.capacity_mah_per_g, Some(0.0));
        assert_eq!(rec.datetime.unwrap().to_string(), "2023-09-08 10:00:10");
    }

    #[test]
    fn test_capacity_from_accumulated_charge() {
        let table = parse(SAMPLE).unwrap();
        assert_eq!(table.record(3).capacity_mah, Some(10.0));
        assert_eq!(table.record(5).capacity_mah, Some(5.0));
        assert_eq!(table.record(5).capacity_mah_per_g, None);
        assert_eq!(table.record(5).datetime.unwrap().to_string(), "2023-09-08 10:01:30");
    }

    #[test]
    fn test_rest_capacity_follows_config() {
        assert_eq!(parse(SAMPLE).unwrap().record(4).capacity_mah, None);

        let config = LoaderConfig {
            rest_capacity: RestCapacity::Zero,
            ..LoaderConfig::default()
        };
        let table = parse_text(SAMPLE, &config).unwrap();
        assert_eq!(table.record(4).capacity_mah, Some(0.0));
    }

    #[test]
    fn test_unknown_phase_still_consumes_cycle_number() {
        let text = SAMPLE.replacen("フェイズ,自然電位測定", "フェイズ,インピーダンス", 1);
        let table = parse(&text).unwrap();
        assert_eq!(table.len(), 4);
        assert!(table.records().all(|r| r.cycle == 2));
    }

    #[test]
    fn test_session_must_be_charge_discharge() {
        let text = SAMPLE.replacen("CDC 充放電測定", "CV サイクリックボルタンメトリー", 1);
        let err = parse(&text).unwrap_err();
        assert!(err.is_format_mismatch());
    }

    #[test]
    fn test_missing_analysis_section_fails() {
        let end = SAMPLE.find(ANALYSIS_MARKER).unwrap();
        assert!(parse(&SAMPLE[..end]).is_err());
    }

    #[test]
    fn test_missing_start_time_fails() {
        let text = SAMPLE.replacen("開始時間,,2023-09-08 10:01:00", "メモ,,", 1);
        assert!(parse(&text).is_err());
    }

    #[test]
    fn test_load_through_trait() {
        let file = NamedTempFile::new().unwrap();
        write_shift_jis(file.path(), SAMPLE).unwrap();
        let table = Hz7000.load(file.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.cycle().value(5), 2);
    }
}
