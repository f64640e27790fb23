//! End-to-end detection scenarios through the public API.

use approx::assert_relative_eq;
use indexmap::IndexMap;

use outlier_rs::core::config::LimitsConfig;
use outlier_rs::{
    merge, ColumnSelection, CutoffFilter, ManagePolicy, MethodKind, MethodParams, OutlierConfig,
    OutlierError, OutlierSet, RowId, Sample, Table, Threshold, Value,
};

fn survey() -> Table {
    let mut columns = IndexMap::new();
    columns.insert(
        "participant".to_string(),
        ["P1", "P2", "P3", "P4", "P5", "P6"].iter().map(|s| Value::from(*s)).collect(),
    );
    columns.insert(
        "rt".to_string(),
        [1.0, 2.0, 3.0, 4.0, 5.0, 100.0].into_iter().map(Value::Number).collect(),
    );
    columns.insert(
        "score".to_string(),
        vec![
            Value::Number(10.0),
            Value::Missing,
            Value::Number(11.0),
            Value::Number(12.0),
            Value::Number(10.5),
            Value::Number(11.5),
        ],
    );
    Table::from_columns(columns).unwrap()
}

fn sample() -> Sample {
    Sample::new(
        survey(),
        &ColumnSelection::All,
        Some("participant"),
        OutlierConfig::default(),
    )
    .unwrap()
}

#[test]
fn iqr_reports_bounds_around_the_median() {
    let result = sample().method_iqr(Some(1.5)).unwrap();
    let Threshold::Bounds { low, high } = *result.threshold_for("rt").unwrap() else {
        panic!("expected two-sided bounds");
    };
    assert_relative_eq!(low, -0.25);
    assert_relative_eq!(high, 7.25);
    assert_eq!(result.all_flagged(), &[RowId::from("P6")]);
    assert_eq!(result.count()["score"], 0);
}

#[test]
fn missing_cells_are_never_flagged() {
    let sample = sample();
    for kind in [MethodKind::Iqr, MethodKind::Sd, MethodKind::Mad, MethodKind::Tukey] {
        let result = sample.detect_default(kind).unwrap();
        assert!(!result.flagged()["score"].contains(&RowId::from("P2")));
    }
}

#[test]
fn every_method_runs_on_the_survey() {
    let sample = sample();
    for kind in MethodKind::ALL {
        let result = match kind {
            MethodKind::Cutoff => sample.method_cutoff(50.0, None, None).unwrap(),
            _ => sample.detect_default(kind).unwrap(),
        };
        assert_eq!(result.kind(), kind);
        let total: usize = result.count().values().sum();
        assert_eq!(total, result.flagged().values().map(|ids| ids.len()).sum::<usize>());
    }
}

#[test]
fn recursive_sd_catches_masked_outliers() {
    let table = Table::from_numeric(vec![(
        "x",
        vec![10.0, 10.5, 9.5, 10.2, 9.8, 10.1, 9.9, 10.3, 9.7, 10.0, 14.0, 60.0],
    )])
    .unwrap();
    let sample = Sample::new(table, &ColumnSelection::All, None, OutlierConfig::default()).unwrap();

    let plain = sample.method_sd(Some(2.5)).unwrap();
    let recursive = sample.method_rsd(Some(2.5), Some(50)).unwrap();
    assert_eq!(plain.count()["x"], 1);
    assert!(recursive.count()["x"] > plain.count()["x"]);
    assert!(recursive.flagged()["x"].contains(&RowId::Int(10)));
}

#[test]
fn percentile_flags_both_tails() {
    let values: Vec<f64> = (0..100).map(f64::from).collect();
    let table = Table::from_numeric(vec![("x", values)]).unwrap();
    let sample = Sample::new(table, &ColumnSelection::All, None, OutlierConfig::default()).unwrap();
    let result = sample.method_prctile(Some(0.05)).unwrap();
    let flagged = &result.flagged()["x"];
    assert!(flagged.contains(&RowId::Int(0)));
    assert!(flagged.contains(&RowId::Int(99)));
    assert!(!flagged.contains(&RowId::Int(50)));

    assert!(sample.method_prctile(Some(0.5)).is_err());
}

#[test]
fn cutoff_inclusivity_controls_equality() {
    let table = Table::from_numeric(vec![("x", vec![10.0, 15.0, 20.0])]).unwrap();
    let sample = Sample::new(table, &ColumnSelection::All, None, OutlierConfig::default()).unwrap();

    let inclusive = sample.method_cutoff(15.0, Some(CutoffFilter::LowPass), Some(true)).unwrap();
    assert_eq!(inclusive.position()["x"], vec![2]);
    let exclusive = sample.method_cutoff(15.0, Some(CutoffFilter::LowPass), Some(false)).unwrap();
    assert_eq!(exclusive.position()["x"], vec![1, 2]);
    let high_pass = sample.method_cutoff(15.0, Some(CutoffFilter::HighPass), Some(true)).unwrap();
    assert_eq!(high_pass.position()["x"], vec![0]);
}

#[test]
fn sn_refuses_tables_above_the_pairwise_limit() {
    let values: Vec<f64> = (0..50).map(f64::from).collect();
    let table = Table::from_numeric(vec![("x", values)]).unwrap();
    let config = OutlierConfig {
        limits: LimitsConfig {
            pairwise_warn_rows: 10,
            pairwise_max_rows: 20,
        },
        ..OutlierConfig::default()
    };
    let sample = Sample::new(table, &ColumnSelection::All, None, config).unwrap();
    assert!(matches!(
        sample.method_sn(None),
        Err(OutlierError::ResourceExhaustion { .. })
    ));
}

#[test]
fn degenerate_and_invalid_inputs_are_rejected() {
    let mut columns = IndexMap::new();
    columns.insert("x".to_string(), vec![Value::Missing, Value::Missing]);
    columns.insert("y".to_string(), vec![Value::Number(1.0), Value::Number(2.0)]);
    let table = Table::from_columns(columns).unwrap();
    assert!(matches!(
        Sample::new(
            table.clone(),
            &ColumnSelection::Names(vec!["x".into()]),
            None,
            OutlierConfig::default()
        ),
        Err(OutlierError::DegenerateColumn { .. })
    ));

    let sample = Sample::new(
        table,
        &ColumnSelection::Names(vec!["y".into()]),
        None,
        OutlierConfig::default(),
    )
    .unwrap();
    assert!(matches!(
        sample.method_identical(Some(1.5)),
        Err(OutlierError::InvalidFrequency { .. })
    ));
    assert!(sample.detect(MethodParams::Iqr { distance: -1.0 }).is_err());
}

#[test]
fn curated_merge_then_winsorize() {
    let sample = sample();
    let iqr = sample.method_iqr(Some(1.5)).unwrap();
    let mut mad = sample.method_mad(Some(3.0), None).unwrap();
    mad.add("P3").unwrap();

    let merged = merge(&[&iqr, &mad]).unwrap();
    assert!(merged.all_flagged().contains(&RowId::from("P3")));
    assert!(merged.all_flagged().contains(&RowId::from("P6")));

    let cleaned = merged
        .manage(ManagePolicy::Winsorize, Some(&["rt".to_string()][..]))
        .unwrap();
    let rt = cleaned.numeric("rt").unwrap();
    let (_, high) = merged.clip_bounds("rt").unwrap();
    assert_relative_eq!(rt[5].unwrap(), high);
    assert_eq!(sample.table().numeric("rt").unwrap()[5], Some(100.0));
}
