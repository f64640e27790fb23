//! Command Execution Logic
//!
//! This module contains the command implementations of the `outlier`
//! binary: detection (with merge, inspection and remediation), and the
//! configuration helpers.

use std::path::Path;

use anyhow::{anyhow, Context};
use owo_colors::OwoColorize;
use tabled::{settings::Style as TableStyle, Table as TextTable, Tabled};
use tracing::info;

use outlier_rs::core::config::MethodDefaults;
use outlier_rs::{
    merge, AggregateResult, CellFormat, ColumnSelection, InspectOptions, MethodKind, MethodParams,
    OutlierConfig, OutlierResult, OutlierSet, Sample,
};

use crate::cli::args::{DetectArgs, OutputFormat, ValidateConfigArgs};
use crate::cli::output::{read_table, render_inspect, render_summary_table, write_table};

/// Load configuration from a file or fall back to defaults.
pub fn load_configuration(path: Option<&Path>) -> anyhow::Result<OutlierConfig> {
    match path {
        Some(path) => OutlierConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(OutlierConfig::default()),
    }
}

/// Parameters for `kind`: configured defaults overridden by the flags.
pub fn build_params(
    kind: MethodKind,
    args: &DetectArgs,
    defaults: &MethodDefaults,
) -> anyhow::Result<MethodParams> {
    let params = defaults
        .params_for(kind, args.threshold)
        .ok_or_else(|| anyhow!("--threshold is required for the cut-off method"))?;

    let params = match params {
        MethodParams::Iqr { distance } => MethodParams::Iqr {
            distance: args.distance.unwrap_or(distance),
        },
        MethodParams::Sd { distance } => MethodParams::Sd {
            distance: args.distance.unwrap_or(distance),
        },
        MethodParams::RecursiveSd {
            distance,
            max_iteration,
        } => MethodParams::RecursiveSd {
            distance: args.distance.unwrap_or(distance),
            max_iteration: args.iterations.unwrap_or(max_iteration),
        },
        MethodParams::Mad { distance, b } => MethodParams::Mad {
            distance: args.distance.unwrap_or(distance),
            b: args.b.unwrap_or(b),
        },
        MethodParams::Tukey { distance } => MethodParams::Tukey {
            distance: args.distance.unwrap_or(distance),
        },
        MethodParams::Sn { distance } => MethodParams::Sn {
            distance: args.distance.unwrap_or(distance),
        },
        MethodParams::Percentile { distance } => MethodParams::Percentile {
            distance: args.distance.unwrap_or(distance),
        },
        MethodParams::Cutoff {
            threshold,
            filter,
            inclusive,
        } => MethodParams::Cutoff {
            threshold,
            filter: args.filter.unwrap_or(filter),
            inclusive: inclusive && !args.exclusive,
        },
        MethodParams::Identical { frequency } => MethodParams::Identical {
            frequency: args.frequency.unwrap_or(frequency),
        },
    };
    Ok(params)
}

enum Detection {
    Single(OutlierResult),
    Aggregate(AggregateResult),
}

impl Detection {
    fn as_set(&self) -> &dyn OutlierSet {
        match self {
            Detection::Single(result) => result,
            Detection::Aggregate(result) => result,
        }
    }

    fn text(&self) -> String {
        match self {
            Detection::Single(result) => result.to_string(),
            Detection::Aggregate(result) => result.to_string(),
        }
    }

    fn json(&self) -> anyhow::Result<String> {
        let json = match self {
            Detection::Single(result) => serde_json::to_string_pretty(result)?,
            Detection::Aggregate(result) => serde_json::to_string_pretty(result)?,
        };
        Ok(json)
    }
}

/// Run the selected methods and report, inspect or remediate.
pub fn detect_command(args: DetectArgs) -> anyhow::Result<()> {
    let config = load_configuration(args.config.as_deref())?;
    let table = read_table(&args.input)?;

    let selection = if args.columns.is_empty() {
        ColumnSelection::All
    } else {
        ColumnSelection::Names(args.columns.clone())
    };
    let sample = Sample::new(table, &selection, args.id_column.as_deref(), config)?;
    if !sample.conversion().is_empty() {
        eprint!("{}", sample.conversion().to_string().dimmed());
    }

    let mut results = Vec::with_capacity(args.methods.len());
    for kind in &args.methods {
        let params = build_params(*kind, &args, &sample.config().defaults)?;
        results.push(sample.detect(params)?);
    }

    let detection = if results.len() == 1 {
        match results.pop() {
            Some(result) => Detection::Single(result),
            None => return Err(anyhow!("no detection result")),
        }
    } else {
        let sets: Vec<&dyn OutlierSet> = results.iter().map(|r| r as &dyn OutlierSet).collect();
        Detection::Aggregate(merge(&sets)?)
    };
    let set = detection.as_set();

    match args.format {
        OutputFormat::Text => println!("{}", detection.text()),
        OutputFormat::Json => println!("{}", detection.json()?),
        OutputFormat::Table => print!("{}", render_summary_table(set)),
    }

    if args.inspect {
        let options = InspectOptions {
            aberrant_format: CellFormat::Value,
            other_value_format: CellFormat::Flag,
            keep_all_rows: args.all_rows,
            keep_all_columns: args.all_columns,
        };
        println!("{}", render_inspect(&set.inspect(&options)?));
    }

    if let Some(policy) = args.manage {
        let managed = set.manage(policy, None)?;
        info!(policy = %policy, rows = managed.n_rows(), "Writing remediated table");
        write_table(&managed, args.output.as_deref())?;
    }

    Ok(())
}

/// Print default configuration in YAML format
pub fn print_default_config() -> anyhow::Result<()> {
    println!("{}", "# Default outlier configuration".dimmed());
    println!("{}", "# Save this to a file and customize as needed".dimmed());
    println!("{}", "# Usage: outlier detect --config your-config.yml ...".dimmed());
    println!();

    let config = OutlierConfig::default();
    let yaml_output = serde_yaml::to_string(&config)?;
    println!("{yaml_output}");

    Ok(())
}

/// Validate a configuration file
pub fn validate_config(args: ValidateConfigArgs) -> anyhow::Result<()> {
    println!(
        "{} {}",
        "Validating configuration:".bright_blue().bold(),
        args.config.display().to_string().cyan()
    );
    println!();

    let config = match load_configuration(Some(args.config.as_path())) {
        Ok(config) => {
            println!("{}", "Configuration file is valid!".bright_green().bold());
            println!();
            config
        }
        Err(e) => {
            eprintln!("{} {:#}", "Configuration validation failed:".red(), e);
            println!();
            println!("{}", "Common issues:".bright_blue().bold());
            println!("   • Check YAML syntax (indentation, colons, quotes)");
            println!("   • Percentile distance is a tail fraction in (0, 0.5)");
            println!("   • Identical frequency lies in (0, 1]");
            println!("   • pairwise_warn_rows must not exceed pairwise_max_rows");
            println!();
            println!(
                "{}",
                "Tip: Use 'outlier print-default-config' to see valid format".dimmed()
            );
            std::process::exit(1);
        }
    };

    if args.details {
        #[derive(Tabled)]
        struct DetailRow {
            setting: String,
            value: String,
        }

        let defaults = &config.defaults;
        let detail_rows = vec![
            DetailRow {
                setting: "IQR distance".to_string(),
                value: defaults.iqr_distance.to_string(),
            },
            DetailRow {
                setting: "SD distance".to_string(),
                value: defaults.sd_distance.to_string(),
            },
            DetailRow {
                setting: "rSD distance / max iteration".to_string(),
                value: format!("{} / {}", defaults.rsd_distance, defaults.rsd_max_iteration),
            },
            DetailRow {
                setting: "MAD distance / b".to_string(),
                value: format!("{} / {}", defaults.mad_distance, defaults.mad_b),
            },
            DetailRow {
                setting: "Tukey distance".to_string(),
                value: defaults.tukey_distance.to_string(),
            },
            DetailRow {
                setting: "Sn distance".to_string(),
                value: defaults.sn_distance.to_string(),
            },
            DetailRow {
                setting: "Percentile tail".to_string(),
                value: defaults.percentile_distance.to_string(),
            },
            DetailRow {
                setting: "Identical frequency".to_string(),
                value: defaults.identical_frequency.to_string(),
            },
            DetailRow {
                setting: "Cut-off filter".to_string(),
                value: format!(
                    "{} ({})",
                    defaults.cutoff_filter,
                    if defaults.cutoff_inclusive { "inclusive" } else { "exclusive" }
                ),
            },
            DetailRow {
                setting: "Sn warn / max rows".to_string(),
                value: format!(
                    "{} / {}",
                    config.limits.pairwise_warn_rows, config.limits.pairwise_max_rows
                ),
            },
        ];

        let mut table = TextTable::new(detail_rows);
        table.with(TableStyle::rounded());
        println!("{table}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{Cli, Commands};
    use clap::Parser;
    use outlier_rs::CutoffFilter;

    fn detect_args(extra: &[&str]) -> DetectArgs {
        let mut argv = vec!["outlier", "detect", "--input", "t.json"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).expect("valid arguments").command {
            Commands::Detect(args) => *args,
            _ => panic!("expected detect"),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let args = detect_args(&["-m", "mad", "--distance", "3", "--b", "1"]);
        let params = build_params(MethodKind::Mad, &args, &MethodDefaults::default()).unwrap();
        assert_eq!(params, MethodParams::Mad { distance: 3.0, b: 1.0 });

        let args = detect_args(&["-m", "rsd"]);
        let params = build_params(MethodKind::RecursiveSd, &args, &MethodDefaults::default()).unwrap();
        assert_eq!(
            params,
            MethodParams::RecursiveSd {
                distance: 3.0,
                max_iteration: 50
            }
        );
    }

    #[test]
    fn cutoff_needs_threshold() {
        let args = detect_args(&["-m", "cut-off"]);
        assert!(build_params(MethodKind::Cutoff, &args, &MethodDefaults::default()).is_err());

        let args = detect_args(&[
            "-m",
            "cut-off",
            "--threshold",
            "15",
            "--filter",
            "high-pass",
            "--exclusive",
        ]);
        let params = build_params(MethodKind::Cutoff, &args, &MethodDefaults::default()).unwrap();
        assert_eq!(
            params,
            MethodParams::Cutoff {
                threshold: 15.0,
                filter: CutoffFilter::HighPass,
                inclusive: false
            }
        );
    }
}
