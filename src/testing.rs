//! Test utilities: temp-file fixtures and mock batch sources.
//!
//! Everything here is also used by the crate's own integration tests, but
//! it ships in the library so downstream pipelines can test against the
//! same mocks:
//!
//! - [`TempDirPath`] — a self-cleaning scratch directory.
//! - [`temp_table`] — typed rows written to a temp Parquet file and opened
//!   as a [`ParquetSource`].
//! - [`MemorySource`] — an in-memory [`BatchSource`] with an optional
//!   *declared* row count that may disagree with reality, for exercising
//!   underrun detection.
//! - [`ShortReadSource`] — yields a few good batches, then a decode error,
//!   for exercising error propagation.

use crate::batch::Batch;
use crate::error::EngineError;
use crate::io::parquet::typed_batch;
use crate::source::{BatchScan, BatchSource, ParquetSource, ScanOptions};
use anyhow::{Context, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory that is deleted when dropped.
pub struct TempDirPath {
    #[allow(dead_code)]
    temp_dir: TempDir,
    path: PathBuf,
}

impl TempDirPath {
    /// Create a new temporary directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("create temporary directory")?;
        let path = temp_dir.path().to_path_buf();
        Ok(Self { temp_dir, path })
    }

    /// Path of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file path inside this directory.
    #[must_use]
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }
}

/// Write typed rows to a Parquet file in a fresh temp directory and open it
/// as a [`ParquetSource`].
///
/// Keep the returned [`TempDirPath`] alive for as long as the source is
/// used; dropping it deletes the file.
///
/// # Errors
/// Returns an error if the file cannot be written or reopened.
pub fn temp_table<T: Serialize + serde::Deserialize<'static>>(
    rows: &[T],
) -> Result<(TempDirPath, ParquetSource)> {
    let dir = TempDirPath::new()?;
    let path = dir.file_path("table.parquet");
    crate::io::parquet::write_parquet_vec(&path, rows)?;
    let source = ParquetSource::open(&path)?;
    Ok((dir, source))
}

/// Slice a record batch into consecutive chunks of at most `batch_size`
/// rows.
fn chunk(batch: &RecordBatch, batch_size: usize) -> Vec<RecordBatch> {
    let rows = batch.num_rows();
    let mut chunks = Vec::new();
    let mut offset = 0;
    while offset < rows {
        let len = batch_size.min(rows - offset);
        chunks.push(batch.slice(offset, len));
        offset += len;
    }
    chunks
}

/// An in-memory [`BatchSource`] over one record batch.
///
/// Supports the same projection and batch-size semantics as
/// [`ParquetSource`]. `declared_rows` lets a test claim a row count that
/// differs from what scans actually produce, which is how sampler underrun
/// detection is exercised.
pub struct MemorySource {
    batch: RecordBatch,
    declared_rows: Option<u64>,
}

impl MemorySource {
    /// Build a source from typed rows.
    ///
    /// # Errors
    /// Returns an error if the rows cannot be converted to a record batch.
    pub fn from_rows<T: Serialize + serde::Deserialize<'static>>(rows: &[T]) -> Result<Self> {
        Ok(Self {
            batch: typed_batch(rows)?,
            declared_rows: None,
        })
    }

    /// Build a source from an existing record batch.
    #[must_use]
    pub fn from_record_batch(batch: RecordBatch) -> Self {
        Self {
            batch,
            declared_rows: None,
        }
    }

    /// Override the row count the source declares (scans are unaffected).
    #[must_use]
    pub fn with_declared_rows(mut self, rows: u64) -> Self {
        self.declared_rows = Some(rows);
        self
    }
}

impl BatchSource for MemorySource {
    fn total_rows(&self) -> u64 {
        self.declared_rows
            .unwrap_or(self.batch.num_rows() as u64)
    }

    fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    fn scan(&self, options: &ScanOptions) -> Result<BatchScan> {
        let schema = self.batch.schema();
        let projection = options.resolve(&schema)?;
        let projected = match &projection {
            None => self.batch.clone(),
            Some(indices) => self
                .batch
                .project(indices)
                .context("project in-memory batch")?,
        };
        let chunks = chunk(&projected, options.batch_size);
        Ok(Box::new(chunks.into_iter().map(|b| Ok(Batch::new(b)))))
    }
}

/// A source whose scan fails with a decode error after a number of good
/// batches.
pub struct ShortReadSource {
    batch: RecordBatch,
    good_batches: usize,
}

impl ShortReadSource {
    /// Build a source from typed rows that yields `good_batches` batches
    /// and then fails.
    ///
    /// # Errors
    /// Returns an error if the rows cannot be converted to a record batch.
    pub fn from_rows<T: Serialize + serde::Deserialize<'static>>(
        rows: &[T],
        good_batches: usize,
    ) -> Result<Self> {
        Ok(Self {
            batch: typed_batch(rows)?,
            good_batches,
        })
    }
}

impl BatchSource for ShortReadSource {
    fn total_rows(&self) -> u64 {
        self.batch.num_rows() as u64
    }

    fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    fn scan(&self, options: &ScanOptions) -> Result<BatchScan> {
        let schema = self.batch.schema();
        let projection = options.resolve(&schema)?;
        let projected = match &projection {
            None => self.batch.clone(),
            Some(indices) => self
                .batch
                .project(indices)
                .context("project in-memory batch")?,
        };
        let good: Vec<RecordBatch> = chunk(&projected, options.batch_size)
            .into_iter()
            .take(self.good_batches)
            .collect();
        let tail = std::iter::once_with(|| -> Result<Batch> {
            Err(EngineError::SourceRead("simulated decode failure".into()).into())
        });
        Ok(Box::new(
            good.into_iter().map(|b| Ok(Batch::new(b))).chain(tail),
        ))
    }
}
