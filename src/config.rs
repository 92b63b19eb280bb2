//! Loader configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Capacity assigned to Rest rows inside HZ7000 charge/discharge blocks.
/// The instrument reports no capacity for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestCapacity {
    /// Leave the capacity unset.
    #[default]
    Null,
    /// Report zero capacity.
    Zero,
}

impl RestCapacity {
    pub fn value(self) -> Option<f64> {
        match self {
            RestCapacity::Null => None,
            RestCapacity::Zero => Some(0.0),
        }
    }
}

/// Settings shared by all vendor parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// SD8 header window: parsing fails once the line index passes this
    /// value without the column-title row having been seen.
    #[serde(default = "default_header_scan_lines")]
    pub header_scan_lines: usize,

    /// `chrono` format of the SD8 measurement start line.
    #[serde(default = "default_sd8_start_format")]
    pub sd8_start_format: String,

    /// `chrono` format of the Biologic absolute time column.
    #[serde(default = "default_biologic_time_format")]
    pub biologic_time_format: String,

    /// `chrono` format of the HZ7000 per-phase start time.
    #[serde(default = "default_hz7000_start_format")]
    pub hz7000_start_format: String,

    #[serde(default)]
    pub rest_capacity: RestCapacity,
}

fn default_header_scan_lines() -> usize {
    30
}

fn default_sd8_start_format() -> String {
    "%Y/%m/%d %H:%M:%S".to_string()
}

fn default_biologic_time_format() -> String {
    "%m/%d/%Y %H:%M:%S%.f".to_string()
}

fn default_hz7000_start_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            header_scan_lines: default_header_scan_lines(),
            sd8_start_format: default_sd8_start_format(),
            biologic_time_format: default_biologic_time_format(),
            hz7000_start_format: default_hz7000_start_format(),
            rest_capacity: RestCapacity::default(),
        }
    }
}

impl LoaderConfig {
    /// Read a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).context("parsing config JSON")
    }
}
