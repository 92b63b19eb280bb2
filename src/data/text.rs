//! Decoding and field parsing shared by the vendor parsers.

use std::path::Path;

use chrono::{NaiveDateTime, TimeDelta};
use encoding_rs::SHIFT_JIS;

use super::error::{DataError, Result};

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a Shift_JIS text file. A UTF-8 byte-order mark switches to UTF-8.
pub fn read_shift_jis(path: &Path) -> Result<String> {
    let bytes = read_bytes(path)?;
    let (text, _, had_errors) = SHIFT_JIS.decode(&bytes);
    if had_errors {
        return Err(DataError::validation("file is not valid Shift_JIS text"));
    }
    Ok(text.into_owned())
}

/// Read a UTF-8 (or plain ASCII) text file.
pub fn read_utf8(path: &Path) -> Result<String> {
    let bytes = read_bytes(path)?;
    String::from_utf8(bytes).map_err(|_| DataError::validation("file is not valid UTF-8 text"))
}

/// Encode `text` as Shift_JIS and write it to `path`.
pub fn write_shift_jis(path: &Path, text: &str) -> Result<()> {
    let (bytes, _, had_errors) = SHIFT_JIS.encode(text);
    if had_errors {
        return Err(DataError::validation(
            "text contains characters not representable in Shift_JIS",
        ));
    }
    std::fs::write(path, bytes).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// -- field parsing --

/// Parse a required float field.
pub fn parse_f64(field: Option<&str>, what: &str, row: usize) -> Result<f64> {
    let raw = field.map(str::trim).unwrap_or("");
    raw.parse::<f64>().map_err(|_| {
        DataError::validation(format!("row {row}: {what} '{raw}' is not a number"))
    })
}

/// Parse an optional float field; an empty field is `None`.
pub fn parse_opt_f64(field: Option<&str>, what: &str, row: usize) -> Result<Option<f64>> {
    match field.map(str::trim) {
        None | Some("") => Ok(None),
        Some(_) => parse_f64(field, what, row).map(Some),
    }
}

/// Parse an integer field that may be written as a float (`1.000000E+000`).
pub fn parse_i32(field: Option<&str>, what: &str, row: usize) -> Result<i32> {
    let raw = field.map(str::trim).unwrap_or("");
    if let Ok(v) = raw.parse::<i32>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 => {
            Ok(v as i32)
        }
        _ => Err(DataError::validation(format!(
            "row {row}: {what} '{raw}' is not an integer"
        ))),
    }
}

pub fn parse_datetime(raw: &str, format: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, format).map_err(|e| {
        DataError::validation(format!("'{raw}' does not match '{format}': {e}"))
    })
}

// -- time arithmetic --

/// `start` plus `seconds`, rounded to the millisecond.
pub fn offset_by_seconds(start: NaiveDateTime, seconds: f64) -> Result<NaiveDateTime> {
    let millis = (seconds * 1000.0).round();
    if !millis.is_finite() {
        return Err(DataError::validation(format!(
            "elapsed time {seconds} is not finite"
        )));
    }
    TimeDelta::try_milliseconds(millis as i64)
        .and_then(|delta| start.checked_add_signed(delta))
        .ok_or_else(|| DataError::validation(format!("elapsed time {seconds} s out of range")))
}

/// Seconds elapsed from `start` to `t`.
pub fn seconds_between(start: NaiveDateTime, t: NaiveDateTime) -> f64 {
    let delta = t - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}
