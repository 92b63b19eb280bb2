use std::fmt;
use std::path::Path;

use crate::config::LoaderConfig;

use super::error::{DataError, Result};
use super::model::CyclingTable;
use super::persist::read_parquet;
use super::vendors::{Biologic, Hz7000, Sd8};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a cycling table from a file.  Dispatch by extension.
///
/// * `.parquet` / `.pq` – a table previously written by
///   [`write_parquet`](super::persist::write_parquet)
/// * anything else – a raw instrument export, format auto-detected
pub fn load_file(path: &Path) -> Result<CyclingTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => read_parquet(path),
        _ => detect_and_load(path),
    }
}

/// Try every vendor parser with the default configuration.
pub fn detect_and_load(path: &Path) -> Result<CyclingTable> {
    Dispatcher::default().detect_and_load(path)
}

// ---------------------------------------------------------------------------
// Vendor parsers
// ---------------------------------------------------------------------------

/// Instrument family a file was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    /// Hokuto Denko SD8: header-scan CSV.
    Sd8,
    /// Biologic: tab-separated export, mode from current sign.
    Biologic,
    /// Hokuto Denko HZ7000: multi-block session log.
    Hz7000,
}

impl Vendor {
    pub fn name(self) -> &'static str {
        match self {
            Vendor::Sd8 => "SD8",
            Vendor::Biologic => "Biologic",
            Vendor::Hz7000 => "HZ7000",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One instrument format.
pub trait VendorParser {
    fn vendor(&self) -> Vendor;

    /// Interpret `path` as this vendor's format.
    fn parse(&self, path: &Path, config: &LoaderConfig) -> Result<CyclingTable>;

    /// [`parse`](Self::parse) with every non-I/O failure reported as
    /// [`DataError::Validation`].
    fn load(&self, path: &Path, config: &LoaderConfig) -> Result<CyclingTable> {
        self.parse(path, config).map_err(DataError::into_mismatch)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Tries vendor parsers in a fixed priority order and returns the first
/// table that parses.
pub struct Dispatcher {
    config: LoaderConfig,
    parsers: Vec<Box<dyn VendorParser>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl Dispatcher {
    /// Dispatcher over SD8, then Biologic, then HZ7000.
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            parsers: vec![Box::new(Sd8), Box::new(Biologic), Box::new(Hz7000)],
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Vendors in the order they are tried.
    pub fn order(&self) -> Vec<Vendor> {
        self.parsers.iter().map(|p| p.vendor()).collect()
    }

    /// Find the vendor whose parser accepts `path`.
    ///
    /// A format mismatch moves on to the next parser; an I/O failure aborts.
    pub fn detect(&self, path: &Path) -> Result<(Vendor, CyclingTable)> {
        for parser in &self.parsers {
            let vendor = parser.vendor();
            match parser.load(path, &self.config) {
                Ok(table) => {
                    log::info!(
                        "Loaded {} as {vendor}: {} rows",
                        path.display(),
                        table.len()
                    );
                    return Ok((vendor, table));
                }
                Err(e) if e.is_format_mismatch() => {
                    log::debug!("{} is not {vendor}: {e}", path.display());
                }
                Err(e) => return Err(e),
            }
        }
        Err(DataError::validation(format!(
            "None of the parsers could handle {}",
            path.display()
        )))
    }

    pub fn detect_and_load(&self, path: &Path) -> Result<CyclingTable> {
        self.detect(path).map(|(_, table)| table)
    }
}
