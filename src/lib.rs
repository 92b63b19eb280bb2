//! Battery cycling data: vendor file parsing into one canonical Arrow table,
//! step/cycle segmentation and nearest-value search.

pub mod analysis;
pub mod config;
pub mod data;
pub mod search;

pub use analysis::curves::{Curve, TimeUnit};
pub use analysis::segment::SegmentIndex;
pub use analysis::Analyser;
pub use config::LoaderConfig;
pub use data::error::{AnalysisError, DataError, QueryError, SearchError};
pub use data::loader::{detect_and_load, load_file, Dispatcher, Vendor, VendorParser};
pub use data::model::{CyclingRecord, CyclingTable, Mode, StepKey};
pub use data::persist::{read_parquet, write_parquet};
pub use search::{NearestSearch, SearchKey};
