//! Incremental per-column statistics over a streamed table.
//!
//! [`RunningStats`] folds batches into a running mean/variance/min/max/count
//! summary, one [`ColumnStats`] per numeric column. Merging uses the
//! parallel combination formula (Chan et al.), so for any batch size the
//! result matches the statistics of the whole table computed at once:
//! count, min and max exactly, mean and variance within floating-point
//! tolerance. [`table_stats`] is the one-pass entry point.

use crate::batch::Batch;
use crate::driver;
use crate::source::{BatchSource, ScanOptions};
use anyhow::{Context, Result};
use arrow::array::Float64Array;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary state for one numeric column.
///
/// `variance` is the population variance. `count` is the number of non-null
/// values folded in so far; rows where the column is null contribute
/// nothing to any of the five fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub count: u64,
    pub mean: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    /// Fold another summary into this one.
    ///
    /// Parallel combination of means and variances; stays numerically
    /// stable across arbitrarily many merges, unlike a running
    /// sum-of-squares.
    fn merge(&mut self, other: &ColumnStats) {
        #[allow(clippy::cast_precision_loss)]
        let na = self.count as f64;
        #[allow(clippy::cast_precision_loss)]
        let nb = other.count as f64;
        let nab = na + nb;
        let delta = other.mean - self.mean;
        let m2a = na * self.variance;
        let m2b = nb * other.variance;
        self.mean += delta * nb / nab;
        self.variance = (m2a + m2b + delta * delta * na * nb / nab) / nab;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

/// Final summary of one pass: per-column statistics plus the table row count.
///
/// Serializable, so callers can persist it alongside the table it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStats {
    /// Rows seen by the pass (including rows that were null in every
    /// projected column).
    pub total_rows: u64,
    /// Statistics per numeric column, keyed by column name.
    pub columns: BTreeMap<String, ColumnStats>,
}

impl TableStats {
    /// Statistics for one column, if it was numeric and had any values.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.get(name)
    }

    /// Export the summary as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize table statistics")
    }

    /// Write the summary to a JSON file.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("write {}", path.display()))
    }
}

/// Online accumulator: an explicit two-state machine.
///
/// `Empty` means "no batch seen yet" — distinct from a summary of a
/// zero-row table. The first [`update`](Self::update) initializes the
/// accumulator directly from that batch's own statistics rather than
/// merging against an undefined prior; every later update merges. After the
/// driving pass completes the accumulator is read-only:
/// [`finish`](Self::finish) consumes it.
#[derive(Debug, Clone, Default)]
pub enum RunningStats {
    #[default]
    Empty,
    Accumulating {
        total_rows: u64,
        columns: BTreeMap<String, ColumnStats>,
    },
}

impl RunningStats {
    #[must_use]
    pub fn new() -> Self {
        Self::Empty
    }

    /// Fold one batch into the running summary.
    ///
    /// # Errors
    /// Returns an error if a numeric column cannot be extracted from the
    /// batch.
    pub fn update(&mut self, batch: &Batch) -> Result<()> {
        let fresh = batch_stats(batch)?;
        let rows = batch.num_rows() as u64;
        match self {
            Self::Empty => {
                *self = Self::Accumulating {
                    total_rows: rows,
                    columns: fresh,
                };
            }
            Self::Accumulating {
                total_rows,
                columns,
            } => {
                *total_rows += rows;
                for (name, stats) in fresh {
                    match columns.get_mut(&name) {
                        Some(existing) => existing.merge(&stats),
                        // Column was all-null in every earlier batch.
                        None => {
                            columns.insert(name, stats);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Consume the accumulator into its final table summary.
    #[must_use]
    pub fn finish(self) -> TableStats {
        match self {
            Self::Empty => TableStats {
                total_rows: 0,
                columns: BTreeMap::new(),
            },
            Self::Accumulating {
                total_rows,
                columns,
            } => TableStats {
                total_rows,
                columns,
            },
        }
    }
}

/// Batch-local statistics for every numeric column, skipping columns with
/// no non-null values in this batch.
fn batch_stats(batch: &Batch) -> Result<BTreeMap<String, ColumnStats>> {
    let mut out = BTreeMap::new();
    for field in batch.schema().fields() {
        if !field.data_type().is_numeric() {
            continue;
        }
        let values = batch.f64_column(field.name())?;
        if let Some(stats) = column_stats(&values) {
            out.insert(field.name().clone(), stats);
        }
    }
    Ok(out)
}

/// Two-pass mean/variance over one in-memory column slice.
fn column_stats(values: &Float64Array) -> Option<ColumnStats> {
    let mut count = 0u64;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.iter().flatten() {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    if count == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = count as f64;
    let mean = sum / n;
    let mut m2 = 0.0;
    for v in values.iter().flatten() {
        let d = v - mean;
        m2 += d * d;
    }
    Some(ColumnStats {
        count,
        mean,
        variance: m2 / n,
        min,
        max,
    })
}

/// Compute per-column statistics for a table in one streaming pass.
///
/// Drives `source` once with [`apply`](crate::apply), folding each batch
/// into a [`RunningStats`] accumulator. Restricting `options` to a column
/// subset restricts the summary the same way; non-numeric columns are
/// ignored.
///
/// # Errors
/// Propagates scan configuration and decode errors; no partial summary is
/// returned.
pub fn table_stats<S>(source: &S, options: &ScanOptions) -> Result<TableStats>
where
    S: BatchSource + ?Sized,
{
    let mut acc = RunningStats::new();
    driver::apply(source, options, |batch| acc.update(batch))?;
    Ok(acc.finish())
}
