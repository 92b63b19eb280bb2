//! Synthetic instrument exports, one per vendor format.
//!
//! Every cycle is a constant-current charge, a rest and a discharge, each
//! `points_per_step` samples long and 10 s apart. Potentials follow a linear
//! ramp plus a little deterministic noise.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use super::error::{DataError, Result};
use super::loader::Vendor;
use super::model::Mode;
use super::text::write_shift_jis;

const SAMPLE_INTERVAL_SEC: f64 = 10.0;
const CURRENT_MA: f64 = 0.5;
/// Active mass used for specific capacity, in grams.
const ACTIVE_MASS_G: f64 = 0.01;

/// Size of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleShape {
    pub cycles: usize,
    pub points_per_step: usize,
}

impl Default for SampleShape {
    fn default() -> Self {
        Self {
            cycles: 3,
            points_per_step: 5,
        }
    }
}

impl SampleShape {
    /// Rows produced by the charge/rest/discharge cycles.
    pub fn cycling_rows(&self) -> usize {
        self.cycles * 3 * self.points_per_step
    }
}

// ---------------------------------------------------------------------------
// Noise
// ---------------------------------------------------------------------------

/// Deterministic Gaussian jitter (xorshift64* with a Box-Muller draw).
struct Jitter(u64);

impl Jitter {
    fn seeded(seed: u64) -> Self {
        // xorshift state must never be zero.
        Jitter(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
    }

    fn uniform(&mut self) -> f64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        let bits = self.0.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }

    fn around(&mut self, centre: f64, spread: f64) -> f64 {
        let radius = (-2.0 * self.uniform().max(f64::MIN_POSITIVE).ln()).sqrt();
        let angle = std::f64::consts::TAU * self.uniform();
        centre + spread * radius * angle.cos()
    }
}

// ---------------------------------------------------------------------------
// Cycling profile shared by all formats
// ---------------------------------------------------------------------------

struct Sample {
    cycle: usize,
    step: usize,
    mode: Mode,
    time_sec: f64,
    potential_v: f64,
    current_ma: f64,
    /// Step capacity in mAh.
    capacity_mah: f64,
}

fn profile(shape: &SampleShape, seed: u64) -> Vec<Sample> {
    let mut jitter = Jitter::seeded(seed);
    let steps = [(Mode::Charge, 1.0), (Mode::Rest, 0.0), (Mode::Discharge, -1.0)];
    let n = shape.points_per_step.max(1) as f64;

    let mut out = Vec::with_capacity(shape.cycling_rows());
    for cycle in 0..shape.cycles {
        for (s, &(mode, sign)) in steps.iter().enumerate() {
            for p in 0..shape.points_per_step {
                let progress = p as f64 / n;
                let base = match mode {
                    Mode::Charge => 3.0 + progress,
                    Mode::Rest => 3.9,
                    Mode::Discharge => 3.8 - progress,
                };
                let capacity_mah = if mode == Mode::Rest {
                    0.0
                } else {
                    CURRENT_MA * p as f64 * SAMPLE_INTERVAL_SEC / 3600.0
                };
                out.push(Sample {
                    cycle: cycle + 1,
                    step: s + 1,
                    mode,
                    time_sec: out.len() as f64 * SAMPLE_INTERVAL_SEC,
                    potential_v: jitter.around(base, 0.002),
                    current_ma: sign * CURRENT_MA,
                    capacity_mah,
                });
            }
        }
    }
    out
}

fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 9, 8)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .unwrap_or_default()
}

fn japanese(mode: Mode) -> &'static str {
    match mode {
        Mode::Rest => "休止",
        Mode::Charge => "充電",
        Mode::Discharge => "放電",
    }
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// SD8 export: preamble with start time, quoted title row, units row.
pub fn sd8_text(shape: &SampleShape) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "測定開始日時,{}", start_time().format("%Y/%m/%d %H:%M:%S"));
    out.push_str("装置名,SD8\n試料名,sample\n\n");
    out.push_str(
        "\"時間\",\"電圧\",\"電流\",\"電力\",\"容量\",\"比容量\",\
         \"積算容量\",\"温度\",\"予備1\",\"予備2\",\"サイクル\",\"ステップ\",\"モード\"\n",
    );
    out.push_str("\"sec\",\"V\",\"mA\",\"mW\",\"mAh\",\"mAh/g\",\"mAh\",\"℃\",\"\",\"\",\"\",\"\",\"\"\n");
    for s in profile(shape, 8) {
        let _ = writeln!(
            out,
            "{:.1},{:.4},{:.3},{:.4},{:.6},{:.4},0,25.0,0,0,{},{},{}",
            s.time_sec,
            s.potential_v,
            s.current_ma,
            s.potential_v * s.current_ma,
            s.capacity_mah,
            s.capacity_mah / ACTIVE_MASS_G,
            s.cycle,
            s.step,
            japanese(s.mode),
        );
    }
    out
}

/// Biologic export: tab separated, absolute timestamps, 0-based cycles.
pub fn biologic_text(shape: &SampleShape) -> String {
    let mut out = String::from("mode\ttime/s\tEwe/V\t<I>/mA\tCapacity/mA.h\tcycle number\n");
    let start = start_time();
    for s in profile(shape, 11) {
        let t = start + TimeDelta::milliseconds((s.time_sec * 1000.0) as i64);
        let _ = writeln!(
            out,
            "{}\t{}\t{:.4}\t{:.3}\t{:.6}\t{:.6E}",
            if s.mode == Mode::Rest { 3 } else { 1 },
            t.format("%m/%d/%Y %H:%M:%S%.3f"),
            s.potential_v,
            s.current_ma,
            s.capacity_mah,
            (s.cycle - 1) as f64,
        );
    }
    out
}

/// HZ7000 session: one open-circuit phase, then one main phase per cycle.
pub fn hz7000_text(shape: &SampleShape) -> String {
    let mut out = String::from("《ファイルヘッダ》\n測定モード,CDC 充放電測定\n装置,HZ7000\n");
    let start = start_time();
    let mut jitter = Jitter::seeded(70);

    let _ = writeln!(
        out,
        "《測定フェイズヘッダ》\nフェイズ,自然電位測定\n開始時間,,{}\n《測定データ》\nNo,時間,電位\n,s,V",
        start.format("%Y-%m-%d %H:%M:%S")
    );
    for p in 0..shape.points_per_step {
        let _ = writeln!(
            out,
            "{},{:.1},{:.4}",
            p + 1,
            p as f64 * SAMPLE_INTERVAL_SEC,
            jitter.around(3.0, 0.002)
        );
    }

    let samples = profile(shape, 7000);
    let per_cycle = 3 * shape.points_per_step;
    for (c, cycle) in samples.chunks(per_cycle.max(1)).enumerate() {
        let phase_start = start + TimeDelta::hours(c as i64 + 1);
        let _ = writeln!(
            out,
            "《測定フェイズヘッダ》\nフェイズ,本測定\n開始時間,,{}\n《測定データ》\n\
             No,時間,電位,電流,サイクル,+Q,-Q,Q,モード\n,s,V,A,,C,C,C,",
            phase_start.format("%Y-%m-%d %H:%M:%S")
        );
        let t0 = cycle.first().map_or(0.0, |s| s.time_sec);
        let mut charged = 0.0;
        for (i, s) in cycle.iter().enumerate() {
            // Accumulated charge in coulombs.
            let q = s.capacity_mah * 3.6;
            let (plus, minus) = match s.mode {
                Mode::Charge => {
                    charged = q;
                    (q, 0.0)
                }
                Mode::Rest => (charged, 0.0),
                Mode::Discharge => (charged, -q),
            };
            let _ = writeln!(
                out,
                "{},{:.1},{:.4},{:.6},{},{:.6},{:.6},{:.6},{}",
                i + 1,
                s.time_sec - t0,
                s.potential_v,
                s.current_ma / 1000.0,
                s.cycle,
                plus,
                minus,
                plus + minus,
                japanese(s.mode),
            );
        }
    }
    out.push_str("\n《解析データヘッダ》\n解析,なし\n");
    out
}

/// Write a sample file for `vendor` into `dir` and return its path.
pub fn write_sample(vendor: Vendor, dir: &Path, shape: &SampleShape) -> Result<PathBuf> {
    let (name, text) = match vendor {
        Vendor::Sd8 => ("sd8.csv", sd8_text(shape)),
        Vendor::Biologic => ("biologic.txt", biologic_text(shape)),
        Vendor::Hz7000 => ("hz7000.csv", hz7000_text(shape)),
    };
    let path = dir.join(name);
    match vendor {
        Vendor::Biologic => std::fs::write(&path, text).map_err(|source| DataError::Io {
            path: path.clone(),
            source,
        })?,
        Vendor::Sd8 | Vendor::Hz7000 => write_shift_jis(&path, &text)?,
    }
    log::debug!("Wrote {vendor} sample to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::data::vendors::{biologic, hz7000, sd8};

    #[test]
    fn test_sd8_sample_parses() {
        let shape = SampleShape::default();
        let table = sd8::parse_text(&sd8_text(&shape), &LoaderConfig::default()).unwrap();
        assert_eq!(table.len(), shape.cycling_rows());
        assert_eq!(table.cycle().value(table.len() - 1), 3);
        assert!(table.records().all(|r| r.datetime.is_some()));
    }

    #[test]
    fn test_biologic_sample_parses() {
        let shape = SampleShape::default();
        let table = biologic::parse_text(&biologic_text(&shape), &LoaderConfig::default()).unwrap();
        assert_eq!(table.len(), shape.cycling_rows());
        let keys: Vec<_> = table.records().map(|r| (r.cycle, r.step, r.mode)).collect();
        assert_eq!(keys[0], (1, 1, Mode::Charge));
        assert_eq!(keys[5], (1, 2, Mode::Rest));
        assert_eq!(keys[14], (1, 3, Mode::Discharge));
        assert_eq!(keys[15], (2, 1, Mode::Charge));
    }

    #[test]
    fn test_hz7000_sample_parses() {
        let shape = SampleShape::default();
        let table = hz7000::parse_text(&hz7000_text(&shape), &LoaderConfig::default()).unwrap();
        assert_eq!(table.len(), shape.points_per_step + shape.cycling_rows());
        // Open-circuit phase is cycle 1; cycling phases follow.
        assert_eq!(table.record(0).mode, Mode::Rest);
        assert_eq!(table.cycle().value(table.len() - 1), 4);
    }

    #[test]
    fn test_jitter_stays_near_the_ramp() {
        let mut jitter = Jitter::seeded(1);
        let draws: Vec<f64> = (0..1000).map(|_| jitter.around(3.5, 0.002)).collect();
        assert!(draws.iter().all(|v| (v - 3.5).abs() < 0.02));
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((mean - 3.5).abs() < 0.001);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let shape = SampleShape::default();
        assert_eq!(sd8_text(&shape), sd8_text(&shape));
    }
}
