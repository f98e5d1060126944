//! The unit of streaming: one bounded chunk of rows from a columnar source.

use crate::error::EngineError;
use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, UInt64Array};
use arrow::compute;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::de::DeserializeOwned;

/// One batch of rows read from a [`BatchSource`](crate::BatchSource) scan.
///
/// All batches of one scan share the same (possibly column-pruned) schema,
/// and each holds at most the scan's configured `batch_size` rows; the final
/// batch of a scan may be shorter. A `Batch` is handed to the driver's
/// callback by reference and is dropped once the callback returns, so a
/// single batch is the most row data the engine holds at any time.
#[derive(Debug, Clone)]
pub struct Batch {
    inner: RecordBatch,
}

impl Batch {
    pub(crate) fn new(inner: RecordBatch) -> Self {
        Self { inner }
    }

    /// Number of rows in this batch.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.inner.num_rows()
    }

    /// True if the batch holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.num_rows() == 0
    }

    /// Schema shared by every batch of the scan this batch came from.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.inner.schema()
    }

    /// Borrow the underlying Arrow record batch.
    #[must_use]
    pub fn record_batch(&self) -> &RecordBatch {
        &self.inner
    }

    /// Consume the wrapper and return the underlying record batch.
    #[must_use]
    pub fn into_record_batch(self) -> RecordBatch {
        self.inner
    }

    /// Column by name.
    ///
    /// # Errors
    /// `Configuration` if the batch schema has no such column.
    pub fn column(&self, name: &str) -> Result<&ArrayRef> {
        self.inner.column_by_name(name).ok_or_else(|| {
            EngineError::Configuration(format!("unknown column '{name}'")).into()
        })
    }

    /// A numeric column cast to `f64`, nulls preserved.
    ///
    /// # Errors
    /// `Configuration` if the column is missing or not castable to `f64`.
    pub fn f64_column(&self, name: &str) -> Result<Float64Array> {
        let col = self.column(name)?;
        let cast = compute::cast(col, &DataType::Float64).map_err(|e| {
            EngineError::Configuration(format!("column '{name}' is not numeric: {e}"))
        })?;
        let values = cast
            .as_any()
            .downcast_ref::<Float64Array>()
            .context("cast produced a non-f64 array")?;
        Ok(values.clone())
    }

    /// Select rows by in-batch index, preserving each row's column layout.
    ///
    /// Indices may repeat (the result then contains the row more than once)
    /// and may appear in any order; the output rows follow `indices` order.
    ///
    /// # Errors
    /// Returns an error if any index is out of bounds for this batch.
    pub fn select(&self, indices: &[usize]) -> Result<Batch> {
        let idx = UInt64Array::from_iter_values(indices.iter().map(|&i| i as u64));
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.inner.num_columns());
        for col in self.inner.columns() {
            let taken = compute::take(col.as_ref(), &idx, None)
                .context("take rows from batch column")?;
            columns.push(taken);
        }
        let inner = RecordBatch::try_new(self.inner.schema(), columns)
            .context("rebuild record batch from selected rows")?;
        Ok(Self { inner })
    }

    /// Deserialize the batch into typed rows via `serde_arrow`.
    ///
    /// # Errors
    /// Returns an error if the batch columns cannot be mapped onto `T`.
    pub fn to_rows<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        serde_arrow::from_record_batch(&self.inner).context("deserialize batch rows")
    }
}

impl From<RecordBatch> for Batch {
    fn from(inner: RecordBatch) -> Self {
        Self { inner }
    }
}
