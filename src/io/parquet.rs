//! Typed Parquet vector I/O, powered by Serde + Arrow.
//!
//! The engine streams tables it never materializes; this module is the
//! small-data counterpart for everything around it — writing test fixtures,
//! persisting a sampled batch, re-reading a partition to verify it. Schema
//! comes from the row type via `serde_arrow` (`SchemaLike::from_type`), so
//! a plain `#[derive(Serialize, Deserialize)]` struct is enough.

use crate::error::EngineError;
use anyhow::{Context, Result};
use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::{Serialize, de::DeserializeOwned};
use serde_arrow::schema::{SchemaLike, TracingOptions};
use serde_arrow::{from_record_batch, to_record_batch};
use std::fs::File;
use std::path::Path;

/// Convert typed rows into one Arrow record batch, inferring the schema
/// from `T`. Works for an empty slice (a zero-row batch).
pub(crate) fn typed_batch<T: Serialize + serde::Deserialize<'static>>(
    rows: &[T],
) -> Result<RecordBatch> {
    let fields: Vec<FieldRef> = Vec::<FieldRef>::from_type::<T>(TracingOptions::default())
        .context("infer Arrow schema from row type")?;
    to_record_batch(&fields, &rows).context("convert rows to record batch")
}

/// Write typed rows to a Parquet file.
///
/// Writing an empty slice is valid and produces a zero-row file with the
/// schema of `T`.
///
/// # Returns
/// Number of rows written.
///
/// # Errors
/// `PartitionWrite` if the file cannot be created or written; schema
/// inference failures surface as plain errors.
pub fn write_parquet_vec<T: Serialize + serde::Deserialize<'static>>(
    path: impl AsRef<Path>,
    rows: &[T],
) -> Result<usize> {
    let path = path.as_ref();
    let batch = typed_batch(rows)?;

    let file = File::create(path).map_err(|e| EngineError::PartitionWrite {
        path: path.to_path_buf(),
        message: format!("create: {e}"),
    })?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).map_err(|e| {
        EngineError::PartitionWrite {
            path: path.to_path_buf(),
            message: format!("open writer: {e}"),
        }
    })?;
    writer.write(&batch).map_err(|e| EngineError::PartitionWrite {
        path: path.to_path_buf(),
        message: format!("write: {e}"),
    })?;
    writer.close().map_err(|e| EngineError::PartitionWrite {
        path: path.to_path_buf(),
        message: format!("finalize: {e}"),
    })?;

    Ok(rows.len())
}

/// Read an entire Parquet file into typed rows.
///
/// Iterates the file's record batches and deserializes each into `Vec<T>`
/// via `serde_arrow`, appending into one vector. Intended for
/// partition-sized data; use [`ParquetSource`](crate::ParquetSource) and the
/// streaming passes for tables that don't fit in memory.
///
/// # Errors
/// `SourceRead` if the file cannot be opened or decoded; deserialization
/// failures surface as plain errors.
pub fn read_parquet_vec<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| EngineError::SourceRead(format!("open {}: {e}", path.display())))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| {
            EngineError::SourceRead(format!("read parquet footer of {}: {e}", path.display()))
        })?
        .build()
        .map_err(|e| EngineError::SourceRead(format!("open scan of {}: {e}", path.display())))?;

    let mut out: Vec<T> = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| {
            EngineError::SourceRead(format!("decode batch from {}: {e}", path.display()))
        })?;
        let mut rows: Vec<T> = from_record_batch(&batch).context("deserialize batch rows")?;
        out.append(&mut rows);
    }
    Ok(out)
}
