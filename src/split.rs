//! Label-driven fan-out of one table into per-label partition files.
//!
//! [`split_by_label`] partitions a source into one Parquet file per label
//! produced by a caller-supplied row-labeling function. The label domain is
//! discovered by a first read-only pass; a second pass then routes rows to
//! their partition writers. Two passes are required, not an optimization:
//! every writer must be opened with its schema exactly once before any data
//! is appended, and opening a writer mid-pass after rows for its label were
//! already skipped would lose data.
//!
//! Output files are named `{prefix}_{label}.parquet` with the label in its
//! `Display` form; downstream tooling relies on that naming and can resolve
//! the set of files with [`partition_paths`].

use crate::batch::Batch;
use crate::driver;
use crate::error::EngineError;
use crate::source::{BatchSource, ScanOptions, projected_schema};
use anyhow::{Context, Result};
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Labeling verdict for one row.
///
/// `Discard` drops the row from every output; there is no sentinel label
/// value with special meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelOutcome<L> {
    /// Route the row to the partition for `L`.
    Keep(L),
    /// Drop the row.
    Discard,
}

/// One partition file written by a split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionFile {
    /// The label, rendered in its `Display` form (as used in the file name).
    pub label: String,
    pub path: PathBuf,
    /// Rows appended to this partition.
    pub rows: u64,
}

/// Summary of a completed split, sorted by label.
///
/// `total_rows` always equals `discarded` plus the sum of the partitions'
/// row counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitReport {
    pub total_rows: u64,
    pub discarded: u64,
    pub partitions: Vec<PartitionFile>,
}

impl SplitReport {
    /// Export the report as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize split report")
    }

    /// Write the report to a JSON file.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("write {}", path.display()))
    }
}

struct Partition {
    path: PathBuf,
    writer: ArrowWriter<File>,
    rows: u64,
}

/// Split `source` into one `{prefix}_{label}.parquet` file per label.
///
/// `label_fn` is applied to every batch and must return exactly one
/// [`LabelOutcome`] per row. It must be pure and deterministic: it is called
/// twice on identical batches (once per pass). A label that only shows up in
/// the write pass is a caller contract violation the splitter does not
/// detect — those rows have no writer and are dropped. Rows labeled
/// `Discard` appear in no output, and a label seen only on discarded rows
/// produces no file.
///
/// In-batch row order is preserved within each partition. Partition files
/// carry the scan's projected schema.
///
/// # Errors
/// - `Configuration` for invalid options or a `label_fn` whose output
///   length does not match the batch.
/// - `SourceRead` if either pass fails to decode the source.
/// - `PartitionWrite` if an output file cannot be created, appended to, or
///   finalized. Remaining writes are aborted; files already written stay on
///   disk (the split is not atomic).
pub fn split_by_label<S, L, F>(
    source: &S,
    options: &ScanOptions,
    prefix: impl AsRef<Path>,
    label_fn: F,
) -> Result<SplitReport>
where
    S: BatchSource + ?Sized,
    L: Display + Ord + Clone,
    F: Fn(&Batch) -> Result<Vec<LabelOutcome<L>>>,
{
    let prefix = prefix.as_ref();
    let source_schema = source.schema();
    let projection = options.resolve(&source_schema)?;
    let schema = projected_schema(&source_schema, projection.as_deref())?;

    // Discovery pass: the label domain is unknowable without scanning.
    let mut labels: BTreeSet<L> = BTreeSet::new();
    driver::apply(source, options, |batch| {
        for outcome in checked_labels(&label_fn, batch)? {
            if let LabelOutcome::Keep(label) = outcome {
                labels.insert(label);
            }
        }
        Ok(())
    })?;

    // One writer per discovered label, opened before any row is written.
    let mut writers: BTreeMap<L, Partition> = BTreeMap::new();
    for label in labels {
        let path = partition_path(prefix, &label);
        let file = File::create(&path).map_err(|e| EngineError::PartitionWrite {
            path: path.clone(),
            message: format!("create: {e}"),
        })?;
        let props = WriterProperties::builder().build();
        let writer =
            ArrowWriter::try_new(file, schema.clone(), Some(props)).map_err(|e| {
                EngineError::PartitionWrite {
                    path: path.clone(),
                    message: format!("open writer: {e}"),
                }
            })?;
        writers.insert(
            label,
            Partition {
                path,
                writer,
                rows: 0,
            },
        );
    }

    // Write pass.
    let mut total_rows = 0u64;
    let mut discarded = 0u64;
    driver::apply(source, options, |batch| {
        let outcomes = checked_labels(&label_fn, batch)?;
        total_rows += outcomes.len() as u64;

        let mut groups: BTreeMap<&L, Vec<usize>> = BTreeMap::new();
        for (row, outcome) in outcomes.iter().enumerate() {
            match outcome {
                LabelOutcome::Keep(label) => groups.entry(label).or_default().push(row),
                LabelOutcome::Discard => discarded += 1,
            }
        }

        for (label, rows) in groups {
            // No writer: the label was not seen during discovery, which
            // only a non-deterministic label_fn can cause.
            let Some(partition) = writers.get_mut(label) else {
                continue;
            };
            let selected = batch.select(&rows)?;
            partition
                .writer
                .write(selected.record_batch())
                .map_err(|e| EngineError::PartitionWrite {
                    path: partition.path.clone(),
                    message: format!("append: {e}"),
                })?;
            partition.rows += rows.len() as u64;
        }
        Ok(())
    })?;

    let mut partitions = Vec::with_capacity(writers.len());
    for (label, partition) in writers {
        partition.writer.close().map_err(|e| EngineError::PartitionWrite {
            path: partition.path.clone(),
            message: format!("finalize: {e}"),
        })?;
        partitions.push(PartitionFile {
            label: label.to_string(),
            path: partition.path,
            rows: partition.rows,
        });
    }

    Ok(SplitReport {
        total_rows,
        discarded,
        partitions,
    })
}

/// Existing partition files for `prefix`, sorted by path.
///
/// Resolves the `{prefix}_*.parquet` glob that split outputs follow.
///
/// # Errors
/// Returns an error if the directory cannot be listed.
pub fn partition_paths(prefix: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}_*.parquet", prefix.as_ref().display());
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .context("invalid partition pattern")?
        .collect::<Result<_, _>>()
        .context("list partition files")?;
    paths.sort();
    Ok(paths)
}

fn partition_path<L: Display>(prefix: &Path, label: &L) -> PathBuf {
    PathBuf::from(format!("{}_{label}.parquet", prefix.display()))
}

fn checked_labels<L, F>(label_fn: &F, batch: &Batch) -> Result<Vec<LabelOutcome<L>>>
where
    F: Fn(&Batch) -> Result<Vec<LabelOutcome<L>>>,
{
    let outcomes = label_fn(batch)?;
    if outcomes.len() != batch.num_rows() {
        return Err(EngineError::Configuration(format!(
            "label function returned {} outcomes for a batch of {} rows",
            outcomes.len(),
            batch.num_rows()
        ))
        .into());
    }
    Ok(outcomes)
}
