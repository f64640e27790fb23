//! Integration tests for the `outlier` CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

/// Test helper to get the CLI binary
fn outlier_cmd() -> Command {
    Command::cargo_bin("outlier").unwrap()
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/reaction_times.json")
}

#[test]
fn test_cli_help() {
    outlier_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Detect, review and remediate outliers"));
}

#[test]
fn test_detect_text_summary() {
    outlier_cmd()
        .args(["detect", "--id-column", "participant", "-m", "iqr", "--distance", "1.5"])
        .arg("--input")
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Method used : Inter-quartile range"))
        .stdout(predicate::str::contains("The column rt has 1 outlier : P6"))
        .stdout(predicate::str::contains("The column accuracy has 1 outlier : P6"));
}

#[test]
fn test_detect_json_output() {
    let output = outlier_cmd()
        .args(["detect", "--id-column", "participant", "--columns", "rt", "-m", "iqr"])
        .args(["--distance", "1.5", "--format", "json"])
        .arg("--input")
        .arg(fixture())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["count"]["rt"], 1);
    assert_eq!(json["all_flagged"][0], "P6");
    assert_eq!(json["params"]["method"], "iqr");
}

#[test]
fn test_detect_merges_repeated_methods() {
    outlier_cmd()
        .args(["detect", "--id-column", "participant", "--columns", "rt"])
        .args(["-m", "iqr", "-m", "cut-off", "--threshold", "2.5", "--filter", "high-pass"])
        .arg("--input")
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Column tested : rt (iqr, cut-off)"))
        .stdout(predicate::str::contains("The column rt has 3 outliers"));
}

#[test]
fn test_cutoff_without_threshold_fails() {
    outlier_cmd()
        .args(["detect", "-m", "cut-off"])
        .arg("--input")
        .arg(fixture())
        .args(["--id-column", "participant"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--threshold"));
}

#[test]
fn test_detect_inspect_table() {
    outlier_cmd()
        .args(["detect", "--id-column", "participant", "-m", "iqr", "--distance", "1.5"])
        .args(["--format", "table", "--inspect"])
        .arg("--input")
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Flagged"))
        .stdout(predicate::str::contains("P6"));
}

#[test]
fn test_manage_writes_remediated_table() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("clean.json");

    outlier_cmd()
        .args(["detect", "--id-column", "participant", "--columns", "rt", "-m", "iqr"])
        .args(["--distance", "1.5", "--manage", "delete", "--output"])
        .arg(&out)
        .arg("--input")
        .arg(fixture())
        .assert()
        .success();

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["index"].as_array().unwrap().len(), 5);
    assert_eq!(written["columns"]["rt"].as_array().unwrap().len(), 5);
}

#[test]
fn test_unknown_column_fails() {
    outlier_cmd()
        .args(["detect", "--id-column", "participant", "--columns", "weight", "-m", "sd"])
        .arg("--input")
        .arg(fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("weight"));
}

#[test]
fn test_print_default_config() {
    outlier_cmd()
        .arg("print-default-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("iqr_distance"))
        .stdout(predicate::str::contains("pairwise_max_rows"));
}

#[test]
fn test_validate_config() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.yml");
    fs::write(&good, "defaults:\n  iqr_distance: 1.5\n").unwrap();

    outlier_cmd()
        .arg("validate-config")
        .arg(&good)
        .arg("--details")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"))
        .stdout(predicate::str::contains("IQR distance"));

    let bad = dir.path().join("bad.yml");
    fs::write(&bad, "defaults:\n  identical_frequency: 1.5\n").unwrap();

    outlier_cmd()
        .arg("validate-config")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration validation failed"));
}
