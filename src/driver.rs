//! The generic batch-apply primitive every other pass is built on.

use crate::batch::Batch;
use crate::source::{BatchSource, ScanOptions};
use anyhow::Result;

/// Drive one pass over `source`, applying `f` to each batch in storage
/// order, and collect the return values in batch order.
///
/// This is the engine's only touchpoint with a [`crate::BatchScan`]:
/// statistics, splitting, and sampling are all expressed
/// as callbacks handed to `apply`, never as their own iteration loops. `f`
/// runs synchronously; the batch it borrows is dropped before the next one
/// is read, so one batch is the peak row-data footprint of a pass.
///
/// Beyond the single linear read, `apply` itself has no side effects; any
/// side effects are those of `f`.
///
/// # Errors
/// Propagates the first error from the scan (`SourceRead`, `Configuration`)
/// or from `f`, producing no partial result.
///
/// # Example
/// ```ignore
/// use sluicebox::{apply, ParquetSource, ScanOptions};
///
/// let source = ParquetSource::open("table.parquet")?;
/// let row_counts = apply(&source, &ScanOptions::new(100_000), |batch| {
///     Ok(batch.num_rows())
/// })?;
/// ```
pub fn apply<S, T, F>(source: &S, options: &ScanOptions, mut f: F) -> Result<Vec<T>>
where
    S: BatchSource + ?Sized,
    F: FnMut(&Batch) -> Result<T>,
{
    let mut out = Vec::new();
    for batch in source.scan(options)? {
        let batch = batch?;
        out.push(f(&batch)?);
    }
    Ok(out)
}
