use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

use super::model::Mode;

// ---------------------------------------------------------------------------
// DataError – anything that goes wrong while turning a file into a table
// ---------------------------------------------------------------------------

/// Errors raised while loading, validating or persisting a cycling table.
#[derive(Error, Debug)]
pub enum DataError {
    /// The input could not be interpreted as the expected format or schema.
    /// The dispatcher treats this variant as "try the next vendor".
    #[error("data validation failed: {0}")]
    Validation(String),

    /// The file could not be read at all.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
}

impl DataError {
    /// Shorthand for a [`DataError::Validation`] with a formatted message.
    pub fn validation(msg: impl Into<String>) -> Self {
        DataError::Validation(msg.into())
    }

    /// Whether this error means "not this format" rather than a hard failure.
    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, DataError::Validation(_))
    }

    /// Fold any non-I/O failure into [`DataError::Validation`].
    ///
    /// Vendor parsers call this on their result so that Arrow or CSV problems
    /// surface as a format mismatch, never as a separate error kind.
    pub(crate) fn into_mismatch(self) -> Self {
        match self {
            DataError::Io { .. } | DataError::Validation(_) => self,
            other => DataError::Validation(other.to_string()),
        }
    }
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        DataError::Validation(format!("CSV parsing error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

// ---------------------------------------------------------------------------
// QueryError – caller mistakes against the segment index
// ---------------------------------------------------------------------------

/// Invalid queries against a segment index. These are caller errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Rest mode can not be looked up by ordinal")]
    RestNotAddressable,

    #[error("{mode} #{ordinal} does not exist ({available} available)")]
    OrdinalOutOfRange {
        ordinal: usize,
        mode: Mode,
        available: usize,
    },

    #[error("unknown time unit '{0}', expected one of s, m or h")]
    UnknownTimeUnit(String),
}

// ---------------------------------------------------------------------------
// SearchError – invalid nearest-index queries
// ---------------------------------------------------------------------------

/// Invalid construction of, or queries against, a nearest-index search.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search over an empty sequence")]
    Empty,

    #[error("{values} values but {labels} labels")]
    LabelLengthMismatch { values: usize, labels: usize },

    #[error("'{0}' is not a recognised timestamp")]
    InvalidTimestamp(String),

    #[error("query is not comparable (NaN)")]
    NotComparable,
}

// ---------------------------------------------------------------------------
// AnalysisError – failures while slicing a table by step
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Data(#[from] DataError),
}
