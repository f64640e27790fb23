//! CLI Argument Structures
//!
//! This module contains the argument definitions, command structures and
//! value parsers used by the `outlier` binary.

use clap::{Args, Parser, Subcommand, ValueEnum};
use outlier_rs::core::validation::parse_number;
use outlier_rs::{CutoffFilter, ManagePolicy, MethodKind};
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outlier detection for tabular numeric data
#[derive(Parser)]
#[command(name = "outlier")]
#[command(version = VERSION)]
#[command(about = "Detect, review and remediate outliers in tabular data")]
#[command(long_about = "
Detect outliers in the numeric columns of a JSON table with one or several
statistical methods, review them and write a remediated copy of the table.

Common Usage:

  # Inter-quartile range on every column, default distance
  outlier detect --input table.json --method iqr

  # Several methods on two columns, merged into one aggregate
  outlier detect --input table.json --columns rt,score --method mad --method sn

  # Cut-off: flag reaction times above 2500 and blank them
  outlier detect --input table.json --method cut-off --threshold 2500 \\
      --manage na --output cleaned.json

  # Show the default configuration
  outlier print-default-config
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one or more detection methods over a table
    Detect(Box<DetectArgs>),

    /// Print default configuration in YAML format
    #[command(name = "print-default-config")]
    PrintDefaultConfig,

    /// Validate a configuration file
    #[command(name = "validate-config")]
    ValidateConfig(ValidateConfigArgs),
}

/// Arguments of `outlier detect`
#[derive(Args)]
pub struct DetectArgs {
    /// JSON table: {"index": [...], "columns": {"name": [values]}}
    #[arg(short, long)]
    pub input: PathBuf,

    /// Column holding the row identifiers
    #[arg(long)]
    pub id_column: Option<String>,

    /// Columns to test (comma separated); all columns when omitted
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Detection method; repeat to merge several methods
    #[arg(short, long = "method", required = true, value_parser = parse_method)]
    pub methods: Vec<MethodKind>,

    /// Distance for every selected method (percentile: tail fraction)
    #[arg(short, long, value_parser = parse_decimal)]
    pub distance: Option<f64>,

    /// MAD scale constant
    #[arg(long, value_parser = parse_decimal)]
    pub b: Option<f64>,

    /// Maximum iterations of recursive SD
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Cut applied by the cut-off method
    #[arg(long, value_parser = parse_decimal)]
    pub threshold: Option<f64>,

    /// Direction of the cut-off method
    #[arg(long, value_parser = parse_filter)]
    pub filter: Option<CutoffFilter>,

    /// Flag values equal to the cut
    #[arg(long)]
    pub exclusive: bool,

    /// Frequency above which a row is flagged by the identical method
    #[arg(long, value_parser = parse_decimal)]
    pub frequency: Option<f64>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Summary format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Print the review projection of flagged cells
    #[arg(long)]
    pub inspect: bool,

    /// Keep rows without flags in the review projection
    #[arg(long, requires = "inspect")]
    pub all_rows: bool,

    /// Keep untested columns in the review projection
    #[arg(long, requires = "inspect")]
    pub all_columns: bool,

    /// Remediation applied to a copy of the table
    #[arg(long, value_parser = parse_policy)]
    pub manage: Option<ManagePolicy>,

    /// Where to write the remediated table; stdout when omitted
    #[arg(short, long, requires = "manage")]
    pub output: Option<PathBuf>,
}

/// Arguments of `outlier validate-config`
#[derive(Args)]
pub struct ValidateConfigArgs {
    /// Configuration file to validate
    pub config: PathBuf,

    /// Show every setting
    #[arg(long)]
    pub details: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON document of the result
    Json,
    /// Table of per-column counts
    Table,
}

fn parse_method(value: &str) -> Result<MethodKind, String> {
    value.parse().map_err(|e| format!("{e}"))
}

fn parse_decimal(value: &str) -> Result<f64, String> {
    parse_number(value).map_err(|e| format!("{e}"))
}

fn parse_filter(value: &str) -> Result<CutoffFilter, String> {
    value.parse().map_err(|e| format!("{e}"))
}

fn parse_policy(value: &str) -> Result<ManagePolicy, String> {
    value.parse().map_err(|e| format!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_arguments_parse() {
        let cli = Cli::try_parse_from([
            "outlier",
            "detect",
            "--input",
            "t.json",
            "--method",
            "iqr",
            "-m",
            "cutoff",
            "--distance",
            "2,5",
            "--columns",
            "a,b",
        ])
        .expect("valid arguments");
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(args.methods, vec![MethodKind::Iqr, MethodKind::Cutoff]);
        assert_eq!(args.distance, Some(2.5));
        assert_eq!(args.columns, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(args.format, OutputFormat::Text);
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert!(Cli::try_parse_from(["outlier", "detect", "-i", "t.json", "-m", "zscore"]).is_err());
    }
}
