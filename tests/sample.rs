use anyhow::Result;
use serde::{Deserialize, Serialize};
use sluicebox::testing::*;
use sluicebox::*;
use std::collections::HashSet;

#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
struct Row {
    id: i64,
    value: f64,
}

fn rows(n: i64) -> Vec<Row> {
    (0..n)
        .map(|id| Row {
            id,
            value: id as f64 * 1.5,
        })
        .collect()
}

fn sampled_ids(batch: &Batch) -> Result<Vec<i64>> {
    Ok(batch.to_rows::<Row>()?.iter().map(|r| r.id).collect())
}

#[test]
fn sample_of_total_rows_is_the_whole_table() -> Result<()> {
    let (_dir, source) = temp_table(&rows(10))?;
    let sample = sample_rows(&source, 10, &ScanOptions::new(3), 7)?;
    let mut ids = sampled_ids(&sample)?;
    ids.sort_unstable();
    assert_eq!(ids, (0..10).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn below_total_rows_sampling_has_no_duplicates() -> Result<()> {
    let (_dir, source) = temp_table(&rows(200))?;
    let sample = sample_rows(&source, 50, &ScanOptions::new(16), 42)?;
    let ids = sampled_ids(&sample)?;
    assert_eq!(ids.len(), 50);
    let distinct: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(distinct.len(), 50);
    assert!(ids.iter().all(|&id| (0..200).contains(&id)));
    Ok(())
}

#[test]
fn above_total_rows_sampling_draws_with_replacement() -> Result<()> {
    let (_dir, source) = temp_table(&rows(10))?;
    let sample = sample_rows(&source, 25, &ScanOptions::new(4), 42)?;
    let ids = sampled_ids(&sample)?;
    assert_eq!(ids.len(), 25);
    // 25 draws over 10 rows must repeat something.
    let distinct: HashSet<i64> = ids.iter().copied().collect();
    assert!(distinct.len() <= 10);
    assert!(distinct.len() < 25);
    assert!(ids.iter().all(|&id| (0..10).contains(&id)));
    Ok(())
}

#[test]
fn same_seed_same_sample() -> Result<()> {
    let (_dir, source) = temp_table(&rows(500))?;
    let options = ScanOptions::new(64);
    let a = sampled_ids(&sample_rows(&source, 40, &options, 1234)?)?;
    let b = sampled_ids(&sample_rows(&source, 40, &options, 1234)?)?;
    assert_eq!(a, b);

    let c = sampled_ids(&sample_rows(&source, 40, &options, 5678)?)?;
    assert_ne!(a, c);
    Ok(())
}

#[test]
fn batch_size_does_not_change_the_sampled_rows() -> Result<()> {
    let (_dir, source) = temp_table(&rows(300))?;
    let mut small = sampled_ids(&sample_rows(&source, 30, &ScanOptions::new(7), 9)?)?;
    let mut large = sampled_ids(&sample_rows(&source, 30, &ScanOptions::new(300), 9)?)?;
    small.sort_unstable();
    large.sort_unstable();
    assert_eq!(small, large);
    Ok(())
}

#[test]
fn sample_respects_projection() -> Result<()> {
    let (_dir, source) = temp_table(&rows(50))?;
    let options = ScanOptions::new(20).with_columns(["value"]);
    let sample = sample_rows(&source, 5, &options, 3)?;
    assert_eq!(sample.num_rows(), 5);
    assert_eq!(sample.schema().fields().len(), 1);
    assert_eq!(sample.schema().field(0).name(), "value");
    Ok(())
}

#[test]
fn zero_k_yields_an_empty_batch() -> Result<()> {
    let (_dir, source) = temp_table(&rows(10))?;
    let sample = sample_rows(&source, 0, &ScanOptions::new(4), 0)?;
    assert!(sample.is_empty());
    assert_eq!(sample.schema().fields().len(), 2);
    Ok(())
}

#[test]
fn sampling_an_empty_table_is_a_configuration_error() -> Result<()> {
    let source = MemorySource::from_rows(&Vec::<Row>::new())?;
    let err = sample_rows(&source, 3, &ScanOptions::new(4), 0).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Configuration(_))
    ));
    Ok(())
}

#[test]
fn overdeclared_row_count_is_an_underrun() -> Result<()> {
    // The source claims 40 rows but scans only produce 10: some drawn
    // indices can never resolve.
    let source = MemorySource::from_rows(&rows(10))?.with_declared_rows(40);
    let err = sample_rows(&source, 20, &ScanOptions::new(4), 11).unwrap_err();
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::SampleUnderrun { missing }) => assert!(*missing > 0),
        other => panic!("expected SampleUnderrun, got {other:?}"),
    }
    Ok(())
}
