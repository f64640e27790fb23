//! Boundary validation: turning caller input into a table the detectors can
//! trust.
//!
//! Everything here runs once, before detection. The detectors themselves
//! assume the tested columns exist and hold numbers (or missing cells).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::errors::{OutlierError, Result};
use crate::core::table::{RowId, Table, Value};

/// Parse a user supplied number, accepting `,` as the decimal separator.
pub fn parse_number(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(OutlierError::invalid_value(
            "expected a number, got an empty string",
            "number",
            input,
        ));
    }
    let normalized = trimmed.replace(',', ".");
    normalized.parse::<f64>().map_err(|_| {
        OutlierError::invalid_value(format!("'{input}' is not a number"), "number", input)
    })
}

/// Which columns of a table are tested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSelection {
    /// Every column of the table
    #[default]
    All,
    /// Columns by name
    Names(Vec<String>),
    /// Columns by zero-based position
    Positions(Vec<usize>),
}

impl ColumnSelection {
    /// Resolve the selection to an ordered, deduplicated list of column
    /// names. `index_column` names the row identifier column, which is
    /// never tested.
    pub fn resolve(&self, table: &Table, index_column: Option<&str>) -> Result<Vec<String>> {
        let mut resolved: Vec<String> = Vec::new();
        let mut push = |name: String| {
            if !resolved.contains(&name) {
                resolved.push(name);
            }
        };

        match self {
            ColumnSelection::All => {
                table
                    .column_names()
                    .filter(|name| Some(name.as_str()) != index_column)
                    .cloned()
                    .for_each(&mut push);
            }
            ColumnSelection::Names(names) => {
                for name in names {
                    if Some(name.as_str()) == index_column {
                        return Err(OutlierError::invalid_value(
                            format!("'{name}' is the row identifier column and cannot be tested"),
                            "columns",
                            name,
                        ));
                    }
                    if !table.has_column(name) {
                        return Err(OutlierError::column_not_found_in(name, "column selection"));
                    }
                    push(name.clone());
                }
            }
            ColumnSelection::Positions(positions) => {
                let names: Vec<&String> = table.column_names().collect();
                for &position in positions {
                    let name = names.get(position).ok_or_else(|| {
                        OutlierError::column_not_found_in(
                            format!("#{position}"),
                            format!("table has {} columns", names.len()),
                        )
                    })?;
                    if Some(name.as_str()) == index_column {
                        return Err(OutlierError::invalid_value(
                            format!("'{name}' is the row identifier column and cannot be tested"),
                            "columns",
                            position,
                        ));
                    }
                    push((*name).clone());
                }
            }
        }

        if resolved.is_empty() {
            return Err(OutlierError::validation("no column selected for testing"));
        }
        Ok(resolved)
    }
}

impl From<Vec<String>> for ColumnSelection {
    fn from(names: Vec<String>) -> Self {
        ColumnSelection::Names(names)
    }
}

impl From<&[&str]> for ColumnSelection {
    fn from(names: &[&str]) -> Self {
        ColumnSelection::Names(names.iter().map(|name| (*name).to_string()).collect())
    }
}

impl From<Vec<usize>> for ColumnSelection {
    fn from(positions: Vec<usize>) -> Self {
        ColumnSelection::Positions(positions)
    }
}

/// What numeric coercion did to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConversion {
    /// Missing cells before coercion
    pub missing_before: usize,
    /// Missing cells after coercion
    pub missing_after: usize,
    /// Rows whose text could not be parsed and became missing
    pub new_missing: Vec<RowId>,
}

/// Summary of [`coerce_numeric`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Columns that held at least one text cell
    pub converted: IndexMap<String, ColumnConversion>,
}

impl ConversionReport {
    /// Whether coercion changed anything
    pub fn is_empty(&self) -> bool {
        self.converted.is_empty()
    }

    /// Whether coercion introduced missing values
    pub fn introduced_missing(&self) -> bool {
        self.converted.values().any(|c| !c.new_missing.is_empty())
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.converted.is_empty() {
            return writeln!(f, "All tested columns were already numeric.");
        }
        for (column, conversion) in &self.converted {
            writeln!(f, "Column '{column}' was converted to numbers.")?;
            writeln!(
                f,
                "  missing values: {} before, {} after",
                conversion.missing_before, conversion.missing_after
            )?;
            if !conversion.new_missing.is_empty() {
                let ids: Vec<String> = conversion.new_missing.iter().map(RowId::to_string).collect();
                writeln!(f, "  unparseable rows: {}", ids.join(", "))?;
            }
        }
        Ok(())
    }
}

/// Convert text cells of the tested columns to numbers.
///
/// Text that does not parse becomes missing. A column left without a single
/// number fails with `DegenerateColumn`.
pub fn coerce_numeric(table: &mut Table, columns: &[String]) -> Result<ConversionReport> {
    let mut report = ConversionReport::default();
    let index: Vec<RowId> = table.index().to_vec();

    for column in columns {
        let cells = table.column_mut(column)?;
        let has_text = cells.iter().any(|cell| matches!(cell, Value::Text(_)));
        let missing_before = cells.iter().filter(|cell| cell.is_missing()).count();

        if has_text {
            let mut new_missing = Vec::new();
            for (position, cell) in cells.iter_mut().enumerate() {
                if let Value::Text(text) = cell {
                    match parse_number(text) {
                        Ok(number) => *cell = Value::Number(number),
                        Err(_) => {
                            *cell = Value::Missing;
                            new_missing.push(index[position].clone());
                        }
                    }
                }
            }
            let missing_after = cells.iter().filter(|cell| cell.is_missing()).count();
            if !new_missing.is_empty() {
                warn!(
                    column = %column,
                    count = new_missing.len(),
                    "Numeric conversion introduced missing values"
                );
            }
            debug!(column = %column, missing_before, missing_after, "Converted column to numbers");
            report.converted.insert(
                column.clone(),
                ColumnConversion {
                    missing_before,
                    missing_after,
                    new_missing,
                },
            );
        }

        if cells.iter().all(Value::is_missing) {
            return Err(OutlierError::degenerate_column(column.as_str(), "numeric conversion"));
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_table() -> Table {
        let mut columns = IndexMap::new();
        columns.insert(
            "id".to_string(),
            vec![Value::from("p1"), Value::from("p2"), Value::from("p3")],
        );
        columns.insert(
            "rt".to_string(),
            vec![Value::from("1,5"), Value::from(2.0), Value::from("abc")],
        );
        columns.insert(
            "score".to_string(),
            vec![Value::from(3.0), Value::Missing, Value::from(4.0)],
        );
        Table::from_columns(columns).unwrap()
    }

    #[test]
    fn test_parse_number_accepts_comma_decimal() {
        assert_eq!(parse_number("2,5").unwrap(), 2.5);
        assert_eq!(parse_number(" 3.25 ").unwrap(), 3.25);
        assert_eq!(parse_number("-1").unwrap(), -1.0);
        assert!(parse_number("").is_err());
        assert!(parse_number("two").is_err());
    }

    #[test]
    fn test_selection_all_skips_index_column() {
        let table = mixed_table();
        let columns = ColumnSelection::All.resolve(&table, Some("id")).unwrap();
        assert_eq!(columns, vec!["rt".to_string(), "score".to_string()]);
    }

    #[test]
    fn test_selection_by_position_and_name() {
        let table = mixed_table();
        let by_position = ColumnSelection::Positions(vec![2, 1, 2])
            .resolve(&table, None)
            .unwrap();
        assert_eq!(by_position, vec!["score".to_string(), "rt".to_string()]);

        let err = ColumnSelection::Names(vec!["missing".into()])
            .resolve(&table, None)
            .unwrap_err();
        assert!(matches!(err, OutlierError::ColumnNotFound { .. }));

        let err = ColumnSelection::Names(vec!["id".into()])
            .resolve(&table, Some("id"))
            .unwrap_err();
        assert!(matches!(err, OutlierError::Validation { .. }));

        assert!(ColumnSelection::Positions(vec![9]).resolve(&table, None).is_err());
    }

    #[test]
    fn test_coerce_numeric_reports_new_missing() {
        let mut table = mixed_table();
        let columns = vec!["rt".to_string(), "score".to_string()];
        let report = coerce_numeric(&mut table, &columns).unwrap();

        assert_eq!(table.numeric("rt").unwrap(), vec![Some(1.5), Some(2.0), None]);
        let rt = &report.converted["rt"];
        assert_eq!(rt.missing_before, 0);
        assert_eq!(rt.missing_after, 1);
        assert_eq!(rt.new_missing, vec![RowId::Int(2)]);
        assert!(!report.converted.contains_key("score"));
        assert!(report.introduced_missing());
        assert!(report.to_string().contains("unparseable rows: 2"));
    }

    #[test]
    fn test_coerce_numeric_rejects_all_text_column() {
        let mut table = mixed_table();
        let err = coerce_numeric(&mut table, &["id".to_string()]).unwrap_err();
        assert!(matches!(err, OutlierError::DegenerateColumn { .. }));
    }
}
