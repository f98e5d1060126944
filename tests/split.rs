use anyhow::Result;
use serde::{Deserialize, Serialize};
use sluicebox::testing::*;
use sluicebox::*;

#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
struct Row {
    id: i64,
    value: f64,
}

fn rows(n: i64) -> Vec<Row> {
    (0..n)
        .map(|id| Row {
            id,
            value: id as f64,
        })
        .collect()
}

/// Label every row by `f` applied to its `id`.
fn by_id<L>(f: impl Fn(i64) -> LabelOutcome<L>) -> impl Fn(&Batch) -> Result<Vec<LabelOutcome<L>>> {
    move |batch: &Batch| {
        let rows = batch.to_rows::<Row>()?;
        Ok(rows.iter().map(|r| f(r.id)).collect())
    }
}

#[test]
fn threshold_split_scenario() -> Result<()> {
    // Values 1..=10, labeled 0 for <= 5 and 1 otherwise.
    let table: Vec<Row> = (1..=10)
        .map(|id| Row {
            id,
            value: id as f64,
        })
        .collect();
    let (dir, source) = temp_table(&table)?;
    let prefix = dir.file_path("thresh");

    let report = split_by_label(
        &source,
        &ScanOptions::new(3),
        &prefix,
        by_id(|id| LabelOutcome::Keep(i64::from(id > 5))),
    )?;

    assert_eq!(report.total_rows, 10);
    assert_eq!(report.discarded, 0);
    assert_eq!(report.partitions.len(), 2);
    assert_eq!(report.partitions[0].label, "0");
    assert_eq!(report.partitions[1].label, "1");

    let low: Vec<Row> = read_parquet_vec(&report.partitions[0].path)?;
    let high: Vec<Row> = read_parquet_vec(&report.partitions[1].path)?;
    assert_eq!(low.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    assert_eq!(high.iter().map(|r| r.id).collect::<Vec<_>>(), vec![6, 7, 8, 9, 10]);
    Ok(())
}

#[test]
fn constant_label_copies_the_table_in_order() -> Result<()> {
    let table = rows(100);
    let (dir, source) = temp_table(&table)?;
    let prefix = dir.file_path("all");

    let report = split_by_label(
        &source,
        &ScanOptions::new(7),
        &prefix,
        by_id(|_| LabelOutcome::Keep(0i64)),
    )?;

    assert_eq!(report.partitions.len(), 1);
    assert_eq!(report.partitions[0].rows, 100);
    let copied: Vec<Row> = read_parquet_vec(&report.partitions[0].path)?;
    assert_eq!(copied, table);
    Ok(())
}

#[test]
fn row_counts_are_conserved() -> Result<()> {
    let (dir, source) = temp_table(&rows(100))?;
    let prefix = dir.file_path("mod");

    let report = split_by_label(
        &source,
        &ScanOptions::new(9),
        &prefix,
        by_id(|id| {
            if id % 7 == 0 {
                LabelOutcome::Discard
            } else {
                LabelOutcome::Keep(id % 3)
            }
        }),
    )?;

    let kept: u64 = report.partitions.iter().map(|p| p.rows).sum();
    assert_eq!(report.total_rows, 100);
    assert_eq!(kept + report.discarded, report.total_rows);

    // Discarded rows appear in no partition.
    for partition in &report.partitions {
        let rows: Vec<Row> = read_parquet_vec(&partition.path)?;
        assert!(rows.iter().all(|r| r.id % 7 != 0));
    }
    Ok(())
}

#[test]
fn all_discard_produces_no_files() -> Result<()> {
    let (dir, source) = temp_table(&rows(10))?;
    let prefix = dir.file_path("none");

    let report = split_by_label(
        &source,
        &ScanOptions::new(4),
        &prefix,
        by_id(|_| LabelOutcome::<i64>::Discard),
    )?;

    assert_eq!(report.discarded, 10);
    assert!(report.partitions.is_empty());
    assert!(partition_paths(&prefix)?.is_empty());
    Ok(())
}

#[test]
fn string_labels_name_the_files() -> Result<()> {
    let (dir, source) = temp_table(&rows(10))?;
    let prefix = dir.file_path("temp");

    let report = split_by_label(
        &source,
        &ScanOptions::new(10),
        &prefix,
        by_id(|id| LabelOutcome::Keep(if id < 5 { "cold" } else { "hot" })),
    )?;

    let names: Vec<String> = report
        .partitions
        .iter()
        .map(|p| p.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["temp_cold.parquet", "temp_hot.parquet"]);
    Ok(())
}

#[test]
fn partition_paths_globs_the_outputs() -> Result<()> {
    let (dir, source) = temp_table(&rows(30))?;
    let prefix = dir.file_path("bucket");

    let report = split_by_label(
        &source,
        &ScanOptions::new(8),
        &prefix,
        by_id(|id| LabelOutcome::Keep(id % 4)),
    )?;

    let globbed = partition_paths(&prefix)?;
    let mut reported: Vec<_> = report.partitions.iter().map(|p| p.path.clone()).collect();
    reported.sort();
    assert_eq!(globbed, reported);
    Ok(())
}

#[test]
fn projected_split_writes_projected_schema() -> Result<()> {
    #[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
    struct ValueOnly {
        value: f64,
    }

    let (dir, source) = temp_table(&rows(10))?;
    let prefix = dir.file_path("narrow");
    let options = ScanOptions::new(4).with_columns(["value"]);

    let report = split_by_label(&source, &options, &prefix, |batch: &Batch| {
        let values = batch.f64_column("value")?;
        Ok(values
            .iter()
            .map(|v| match v {
                Some(v) if v < 5.0 => LabelOutcome::Keep(0i64),
                _ => LabelOutcome::Keep(1i64),
            })
            .collect())
    })?;

    let narrow: Vec<ValueOnly> = read_parquet_vec(&report.partitions[0].path)?;
    assert_eq!(narrow.len(), 5);
    Ok(())
}

#[test]
fn label_arity_mismatch_is_a_configuration_error() -> Result<()> {
    let (dir, source) = temp_table(&rows(10))?;
    let prefix = dir.file_path("bad");

    let err = split_by_label(&source, &ScanOptions::new(4), &prefix, |_batch: &Batch| {
        Ok(vec![LabelOutcome::Keep(0i64)])
    })
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Configuration(_))
    ));
    Ok(())
}

#[test]
fn report_serializes_to_json() -> Result<()> {
    let (dir, source) = temp_table(&rows(10))?;
    let prefix = dir.file_path("json");

    let report = split_by_label(
        &source,
        &ScanOptions::new(5),
        &prefix,
        by_id(|id| LabelOutcome::Keep(id % 2)),
    )?;
    let json = report.to_json()?;
    assert!(json.contains("discarded"));
    assert!(json.contains("partitions"));

    let path = dir.file_path("report.json");
    report.save_to_file(&path)?;
    let reloaded: SplitReport = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(reloaded.total_rows, report.total_rows);
    Ok(())
}
