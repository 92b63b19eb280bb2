use std::fs::File;
use std::path::Path;

use arrow::compute::concat_batches;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::error::{DataError, Result};
use super::model::CyclingTable;

// ---------------------------------------------------------------------------
// Parquet persistence of canonical tables
// ---------------------------------------------------------------------------

/// Write a canonical table to a Parquet file.
pub fn write_parquet(table: &CyclingTable, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let batch = table.batch();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Read a Parquet file back into a canonical table.
///
/// The file's schema must pass the validator; all row groups are
/// concatenated into a single table.
pub fn read_parquet(path: &Path) -> Result<CyclingTable> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;
    log::debug!("read {} rows from {}", batch.num_rows(), path.display());
    CyclingTable::try_from(batch)
}
