//! # Sluicebox
//!
//! **Streaming batch computations over larger-than-memory Parquet tables.**
//!
//! Sluicebox applies user-defined computations to very large columnar
//! tables one bounded batch at a time, producing results that are provably
//! identical to what a full-materialization computation would produce —
//! without ever holding more than one batch in memory.
//!
//! ## Key Features
//!
//! - **Batch-apply driver** - fold any function over a table, batch by batch
//! - **Incremental statistics** - mean/variance/min/max/count per column,
//!   numerically equivalent for any batch size
//! - **Label splitting** - fan a table out into one Parquet file per label,
//!   with a discard outcome for rows no output should contain
//! - **Random sampling** - `k` uniformly random rows in one streaming pass,
//!   with or without replacement (derived from `k` vs. the row count)
//! - **Restartable sources** - multi-pass components re-scan the same table
//! - **Typed rows** - Serde structs in and out via `serde_arrow`
//!
//! ## Quick Start
//!
//! ```ignore
//! use sluicebox::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let source = ParquetSource::open("events.parquet")?;
//! let options = ScanOptions::new(100_000).with_columns(["latency_ms"]);
//!
//! // One pass: per-column statistics.
//! let stats = table_stats(&source, &options)?;
//! let latency = stats.column("latency_ms").unwrap();
//! println!("mean={} var={}", latency.mean, latency.variance);
//!
//! // Two passes: one output file per label, slow requests discarded.
//! split_by_label(&source, &options, "out/latency", |batch| {
//!     let ms = batch.f64_column("latency_ms")?;
//!     Ok(ms
//!         .iter()
//!         .map(|v| match v {
//!             Some(v) if v < 1_000.0 => LabelOutcome::Keep((v / 100.0) as i64),
//!             _ => LabelOutcome::Discard,
//!         })
//!         .collect())
//! })?;
//!
//! // One pass: 10k random rows.
//! let sample = sample_rows(&source, 10_000, &options, 42)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### BatchSource
//!
//! A [`BatchSource`] is a finite columnar table that can be scanned any
//! number of times, each scan yielding [`Batch`]es of at most
//! `batch_size` rows in storage order, optionally restricted to a column
//! subset. [`ParquetSource`] is the production implementation;
//! [`testing`] provides in-memory ones.
//!
//! ### The driver
//!
//! [`apply`] is the engine's only loop: it drives one scan and hands each
//! batch to a callback, collecting the results in batch order. Statistics,
//! splitting, and sampling are all callbacks over `apply` — they never
//! iterate a source themselves.
//!
//! ### Passes
//!
//! Everything is single-threaded and strictly sequential. Statistics and
//! sampling make exactly one pass; splitting makes two (labels must be
//! discovered before any partition writer can be opened with its schema).
//! A failed pass reports an error, never a truncated result — the one
//! documented exception is the splitter's partial on-disk output.
//!
//! ## Errors
//!
//! Entry points return [`anyhow::Result`] with an [`EngineError`] root
//! cause for the engine's own failure categories: `SourceRead`,
//! `PartitionWrite`, `SampleUnderrun`, `Configuration`. See [`error`].
//!
//! ## Module Overview
//!
//! - [`source`] - `BatchSource`, `ScanOptions`, `ParquetSource`
//! - [`batch`] - the `Batch` value type
//! - [`driver`] - the batch-apply primitive
//! - [`stats`] - incremental per-column statistics
//! - [`split`] - label-driven partitioning
//! - [`sample`] - random row extraction
//! - [`io`] - typed Parquet vector I/O
//! - [`testing`] - fixtures and mock sources

pub mod batch;
pub mod driver;
pub mod error;
pub mod io;
pub mod sample;
pub mod source;
pub mod split;
pub mod stats;
pub mod testing;

// General re-exports
pub use batch::Batch;
pub use driver::apply;
pub use error::EngineError;
pub use io::parquet::{read_parquet_vec, write_parquet_vec};
pub use sample::sample_rows;
pub use source::{BatchScan, BatchSource, DEFAULT_BATCH_SIZE, ParquetSource, ScanOptions};
pub use split::{LabelOutcome, PartitionFile, SplitReport, partition_paths, split_by_label};
pub use stats::{ColumnStats, RunningStats, TableStats, table_stats};
