//! Uniform random row extraction without materializing the table.
//!
//! [`sample_rows`] draws `k` row indices over the whole table up front and
//! then drains that *index pool* across a single streaming pass: each batch
//! resolves the pool entries that fall inside it, and the rest are carried
//! to the next batch with their offsets rebased. This is a streaming
//! alternative to classic reservoir sampling — it needs the total row count
//! in advance (the source declares it) but touches each batch exactly once
//! and never holds more than one batch plus the pool in memory.
//!
//! When `k` exceeds the table's row count, sampling switches to
//! with-replacement automatically; it is a derived policy, not a flag.
//!
//! Draws come from a seeded PRNG, so a given `(seed, k, table)` triple
//! always yields the same sample.

use crate::batch::Batch;
use crate::driver;
use crate::error::EngineError;
use crate::source::{BatchSource, ScanOptions, projected_schema};
use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    const fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform draw in `[0, bound)` by widening multiply; `bound` must be
    /// nonzero.
    #[inline]
    fn next_below(&mut self, bound: u64) -> u64 {
        ((u128::from(self.next_u64()) * u128::from(bound)) >> 64) as u64
    }
}

/// Draw the full index pool for a sample of `k` rows out of `total`.
///
/// `k <= total` draws distinct indices with a partial Fisher–Yates shuffle
/// over a sparse swap map, so memory stays O(k) even for huge tables;
/// `k > total` draws with replacement.
fn draw_pool(k: usize, total: u64, rng: &mut SplitMix64) -> Vec<u64> {
    if k as u64 > total {
        (0..k).map(|_| rng.next_below(total)).collect()
    } else {
        let mut swaps: HashMap<u64, u64> = HashMap::new();
        let mut pool = Vec::with_capacity(k);
        for i in 0..k as u64 {
            let j = i + rng.next_below(total - i);
            let chosen = swaps.get(&j).copied().unwrap_or(j);
            let displaced = swaps.get(&i).copied().unwrap_or(i);
            swaps.insert(j, displaced);
            pool.push(chosen);
        }
        pool
    }
}

/// Extract `k` uniformly random rows from `source` in one streaming pass.
///
/// Returns a single [`Batch`] of exactly `k` rows over the scan's projected
/// schema. Selected rows keep their column layout; the order of rows in the
/// result follows storage order of the underlying table and is not part of
/// the contract. With `k` at most the table's row count the sample contains
/// no duplicate rows; beyond that, indices are drawn with replacement.
///
/// # Errors
/// - `Configuration` for invalid options, or `k > 0` on an empty table.
/// - `SourceRead` if the scan fails to decode.
/// - `SampleUnderrun` if the stream ends while drawn indices remain
///   unresolved, i.e. the source declared more rows than it produced.
pub fn sample_rows<S>(source: &S, k: usize, options: &ScanOptions, seed: u64) -> Result<Batch>
where
    S: BatchSource + ?Sized,
{
    let source_schema = source.schema();
    let projection = options.resolve(&source_schema)?;
    let schema = projected_schema(&source_schema, projection.as_deref())?;

    let total = source.total_rows();
    if total == 0 && k > 0 {
        return Err(
            EngineError::Configuration("cannot sample rows from an empty table".into()).into(),
        );
    }

    let mut rng = SplitMix64::new(seed);
    let mut pool = draw_pool(k, total, &mut rng);

    let mut parts: Vec<RecordBatch> = Vec::new();
    driver::apply(source, options, |batch| {
        let len = batch.num_rows() as u64;
        let mut hits: Vec<usize> = Vec::new();
        let mut rest: Vec<u64> = Vec::with_capacity(pool.len());
        for idx in pool.drain(..) {
            if idx < len {
                hits.push(idx as usize);
            } else {
                rest.push(idx - len);
            }
        }
        pool = rest;
        if !hits.is_empty() {
            parts.push(batch.select(&hits)?.into_record_batch());
        }
        Ok(())
    })?;

    if !pool.is_empty() {
        return Err(EngineError::SampleUnderrun {
            missing: pool.len(),
        }
        .into());
    }

    let combined = concat_batches(&schema, parts.iter()).context("concatenate sampled rows")?;
    Ok(Batch::new(combined))
}
