//! Table I/O and Terminal Rendering
//!
//! This module reads and writes JSON tables and renders results and review
//! projections for the terminal.

use std::path::Path;

use anyhow::Context;
use owo_colors::OwoColorize;
use tabled::{builder::Builder, settings::Style as TableStyle, Table as TextTable, Tabled};

use outlier_rs::{InspectTable, OutlierSet, Table, Threshold};

/// Read a JSON table from disk.
pub fn read_table(path: &Path) -> anyhow::Result<Table> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read table: {}", path.display()))?;
    let table: Table = serde_json::from_str(&content)
        .with_context(|| format!("Invalid table JSON in {}", path.display()))?;
    Ok(table)
}

/// Write a table as JSON, to `path` or stdout.
pub fn write_table(table: &Table, path: Option<&Path>) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(table)?;
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write table: {}", path.display()))?;
            eprintln!(
                "{} {}",
                "Remediated table written to:".bright_green().bold(),
                path.display().to_string().cyan()
            );
        }
        None => println!("{content}"),
    }
    Ok(())
}

#[derive(Tabled)]
struct ColumnRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Methods")]
    methods: String,
    #[tabled(rename = "Flagged")]
    flagged: usize,
    #[tabled(rename = "Thresholds")]
    thresholds: String,
}

fn describe(threshold: &Threshold) -> String {
    match threshold {
        Threshold::Bounds { low, high } => format!("[{low:.2}, {high:.2}]"),
        Threshold::Scalar(value) => format!("{value:.2}"),
    }
}

/// Per-column counts and thresholds as a terminal table.
pub fn render_summary_table(result: &dyn OutlierSet) -> String {
    let aggregate = result.to_aggregate();
    let mut rows: Vec<ColumnRow> = aggregate
        .columns_tested()
        .iter()
        .map(|column| {
            let methods = aggregate
                .columns_tested_with_method()
                .get(column)
                .map(|kinds| {
                    kinds
                        .iter()
                        .map(|k| k.shortname())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            let thresholds = aggregate
                .threshold()
                .get(column)
                .map(|per_method| {
                    per_method
                        .iter()
                        .map(|(kind, t)| format!("{kind}: {}", describe(t)))
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .unwrap_or_default();
            ColumnRow {
                column: column.clone(),
                methods,
                flagged: aggregate.count().get(column).copied().unwrap_or(0),
                thresholds,
            }
        })
        .collect();

    if let Some(manual) = aggregate.count().get(outlier_rs::ADDED_MANUALLY) {
        rows.push(ColumnRow {
            column: outlier_rs::ADDED_MANUALLY.to_string(),
            methods: "manual".to_string(),
            flagged: *manual,
            thresholds: String::new(),
        });
    }

    let mut table = TextTable::new(rows);
    table.with(TableStyle::rounded());
    format!(
        "{}\n{}\n",
        table,
        format!("Rows with at least one flag: {}", aggregate.all_flagged().len()).dimmed()
    )
}

/// The review projection as a terminal table, flagged cells highlighted.
pub fn render_inspect(projection: &InspectTable) -> String {
    let mut builder = Builder::default();
    for row in projection.to_rows() {
        builder.push_record(row.into_iter().map(|cell| {
            if cell == "true" {
                cell.red().bold().to_string()
            } else {
                cell
            }
        }));
    }
    let mut table = builder.build();
    table.with(TableStyle::rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use outlier_rs::{InspectCell, RowId};

    #[test]
    fn round_trips_table_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        std::fs::write(
            &path,
            r#"{"index": ["a", "b"], "columns": {"x": [1.5, null], "y": ["2", 3]}}"#,
        )
        .unwrap();
        let table = read_table(&path).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.index()[0], RowId::from("a"));

        let out = dir.path().join("out.json");
        write_table(&table, Some(out.as_path())).unwrap();
        assert_eq!(read_table(&out).unwrap(), table);
    }

    #[test]
    fn renders_inspect_rows() {
        let mut columns = IndexMap::new();
        columns.insert("x".to_string(), vec![InspectCell::Flag(false)]);
        let projection = InspectTable {
            index: vec![RowId::from("p1")],
            columns,
        };
        let text = render_inspect(&projection);
        assert!(text.contains("p1"));
        assert!(text.contains("false"));
    }
}
