//! Batch sources: where the engine reads from.
//!
//! A [`BatchSource`] yields a finite, single-use sequence of [`Batch`]es in
//! storage order. Sources are *restartable*: calling [`BatchSource::scan`]
//! again starts a fresh pass from the first row, which is what lets the
//! splitter run its discovery pass and its write pass over the same table.
//!
//! [`ParquetSource`] is the production implementation, a thin wrapper over
//! the `parquet` crate's Arrow record-batch reader with projection pushdown.
//! The in-memory sources used by tests live in [`crate::testing`].

use crate::batch::Batch;
use crate::error::EngineError;
use anyhow::{Context, Result};
use arrow::datatypes::{Schema, SchemaRef};
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default row ceiling per batch when the caller does not choose one.
pub const DEFAULT_BATCH_SIZE: usize = 64 * 1024;

/// A single pass over a source: a lazy, finite sequence of batches.
pub type BatchScan = Box<dyn Iterator<Item = Result<Batch>>>;

/// Per-scan configuration: batch-size ceiling and optional column projection.
///
/// Validation happens when a scan starts, not at construction, because it
/// needs the source schema: a zero `batch_size`, an empty projection, or a
/// projected column the schema does not contain all fail the scan with a
/// `Configuration` error.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum number of rows per batch. The final batch of a scan may be
    /// shorter; every other batch holds exactly this many rows.
    pub batch_size: usize,
    /// Columns to read, or `None` for all columns. Projected batches keep
    /// the schema's column order regardless of the order given here.
    pub columns: Option<Vec<String>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            columns: None,
        }
    }
}

impl ScanOptions {
    /// Options with an explicit batch size and no projection.
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            columns: None,
        }
    }

    /// Restrict the scan to the given columns.
    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Check the options against a source schema and resolve the projection
    /// to schema-ordered, deduplicated column indices.
    pub(crate) fn resolve(&self, schema: &Schema) -> Result<Option<Vec<usize>>> {
        if self.batch_size == 0 {
            return Err(EngineError::Configuration("batch size must be positive".into()).into());
        }
        let Some(columns) = &self.columns else {
            return Ok(None);
        };
        if columns.is_empty() {
            return Err(
                EngineError::Configuration("column projection must not be empty".into()).into(),
            );
        }
        let mut indices = Vec::with_capacity(columns.len());
        for name in columns {
            let idx = schema.index_of(name).map_err(|_| {
                EngineError::Configuration(format!("projected column '{name}' not in schema"))
            })?;
            indices.push(idx);
        }
        indices.sort_unstable();
        indices.dedup();
        Ok(Some(indices))
    }
}

/// Schema of the batches a scan with `projection` will produce.
pub(crate) fn projected_schema(schema: &SchemaRef, projection: Option<&[usize]>) -> Result<SchemaRef> {
    match projection {
        None => Ok(schema.clone()),
        Some(indices) => {
            let projected = schema
                .project(indices)
                .context("project source schema")?;
            Ok(Arc::new(projected))
        }
    }
}

/// A finite columnar table the engine can stream over, batch by batch.
pub trait BatchSource {
    /// Total number of rows the source holds, known before any scan.
    fn total_rows(&self) -> u64;

    /// Ordered column schema shared by every batch of every scan.
    fn schema(&self) -> SchemaRef;

    /// Start a fresh pass over the table in storage order.
    ///
    /// # Errors
    /// `Configuration` for invalid options, `SourceRead` if the underlying
    /// table cannot be opened.
    fn scan(&self, options: &ScanOptions) -> Result<BatchScan>;
}

/// A Parquet file as a [`BatchSource`].
///
/// Row count and schema are read from the file metadata once at
/// [`open`](Self::open); each [`scan`](BatchSource::scan) re-opens the file,
/// so any number of sequential passes can be made.
pub struct ParquetSource {
    path: PathBuf,
    schema: SchemaRef,
    total_rows: u64,
}

impl ParquetSource {
    /// Open a Parquet file and cache its metadata.
    ///
    /// # Errors
    /// `SourceRead` if the file cannot be opened or its footer is malformed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let builder = Self::reader_builder(&path)?;
        let schema = builder.schema().clone();
        let total_rows = builder.metadata().file_metadata().num_rows().cast_unsigned();
        Ok(Self {
            path,
            schema,
            total_rows,
        })
    }

    /// Path this source reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader_builder(path: &Path) -> Result<ParquetRecordBatchReaderBuilder<File>> {
        let file = File::open(path)
            .map_err(|e| EngineError::SourceRead(format!("open {}: {e}", path.display())))?;
        ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| {
                EngineError::SourceRead(format!("read parquet footer of {}: {e}", path.display()))
                    .into()
            })
    }
}

impl BatchSource for ParquetSource {
    fn total_rows(&self) -> u64 {
        self.total_rows
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn scan(&self, options: &ScanOptions) -> Result<BatchScan> {
        let projection = options.resolve(&self.schema)?;
        let mut builder = Self::reader_builder(&self.path)?.with_batch_size(options.batch_size);
        if let Some(indices) = &projection {
            let mask = ProjectionMask::roots(builder.parquet_schema(), indices.iter().copied());
            builder = builder.with_projection(mask);
        }
        let reader = builder.build().map_err(|e| {
            EngineError::SourceRead(format!("open scan of {}: {e}", self.path.display()))
        })?;
        let path = self.path.clone();
        Ok(Box::new(reader.map(move |res| {
            res.map(Batch::new).map_err(|e| {
                EngineError::SourceRead(format!("decode batch from {}: {e}", path.display())).into()
            })
        })))
    }
}
