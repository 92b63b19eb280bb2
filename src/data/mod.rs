//! Data layer: core types, loading, and filtering.
//!
//! Architecture:
//! ```text
//!  SD8 .csv / Biologic .txt / HZ7000 .csv
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ Dispatcher  │  try SD8 → Biologic → HZ7000, first match wins
//!   └────────────┘
//!        │ vendor parser → TableBuilder
//!        ▼
//!   ┌──────────────┐
//!   │ CyclingTable  │  Arrow RecordBatch, schema-validated
//!   └──────────────┘
//!        │
//!        ├──► persist   write / read parquet
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  (cycle, step, mode) predicates → row indices
//!   └──────────┘
//! ```

pub mod builder;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod persist;
#[doc(hidden)]
pub mod samples;
pub mod schema;
pub mod text;
pub mod vendors;
