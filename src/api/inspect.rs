//! Review projection: the table with flagged and non-flagged cells rendered
//! for inspection.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::api::results::{OutlierSet, ADDED_MANUALLY};
use crate::core::errors::Result;
use crate::core::table::{RowId, Value};

/// How a cell is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellFormat {
    /// The raw cell value
    Value,
    /// `true` for flagged cells, `false` otherwise
    Flag,
}

/// Options of [`OutlierSet::inspect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectOptions {
    /// Rendering of flagged cells
    pub aberrant_format: CellFormat,
    /// Rendering of non-flagged cells of tested columns
    pub other_value_format: CellFormat,
    /// Keep rows that are not flagged anywhere
    pub keep_all_rows: bool,
    /// Keep columns that were not tested
    pub keep_all_columns: bool,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            aberrant_format: CellFormat::Value,
            other_value_format: CellFormat::Flag,
            keep_all_rows: false,
            keep_all_columns: false,
        }
    }
}

/// One rendered cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InspectCell {
    /// Whether the cell is flagged
    Flag(bool),
    /// The cell's value
    Value(Value),
}

impl fmt::Display for InspectCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectCell::Flag(flag) => write!(f, "{flag}"),
            InspectCell::Value(value) => write!(f, "{value}"),
        }
    }
}

/// The review table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectTable {
    /// Row identifiers, in table order
    pub index: Vec<RowId>,
    /// Rendered cells per column
    pub columns: IndexMap<String, Vec<InspectCell>>,
}

impl InspectTable {
    /// Header row followed by one row per identifier, all as text.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut header = vec![String::new()];
        header.extend(self.columns.keys().cloned());
        let mut rows = vec![header];
        for (row, id) in self.index.iter().enumerate() {
            let mut cells = vec![id.to_string()];
            cells.extend(self.columns.values().map(|column| column[row].to_string()));
            rows.push(cells);
        }
        rows
    }
}

fn render(value: &Value, flagged: bool, options: &InspectOptions) -> InspectCell {
    let format = if flagged {
        options.aberrant_format
    } else {
        options.other_value_format
    };
    match format {
        CellFormat::Value => InspectCell::Value(value.clone()),
        CellFormat::Flag => InspectCell::Flag(flagged),
    }
}

/// Project the result's table for review. Column order follows the table.
pub fn project<R: OutlierSet + ?Sized>(result: &R, options: &InspectOptions) -> Result<InspectTable> {
    let table = result.table();

    // table column → positions flagged for it
    let mut flagged_cells: IndexMap<String, HashSet<usize>> = IndexMap::new();
    for (key, positions) in result.position() {
        if key == ADDED_MANUALLY {
            continue;
        }
        for column in result.target_columns(key) {
            flagged_cells
                .entry(column)
                .or_default()
                .extend(positions.iter().copied());
        }
    }

    let rows: Vec<usize> = if options.keep_all_rows {
        (0..table.n_rows()).collect()
    } else {
        table.positions(result.all_flagged())?
    };

    let mut columns = IndexMap::new();
    for name in table.column_names() {
        let cells = table.column(name)?;
        let rendered: Vec<InspectCell> = match flagged_cells.get(name) {
            Some(hits) => rows
                .iter()
                .map(|&row| render(&cells[row], hits.contains(&row), options))
                .collect(),
            None if options.keep_all_columns => rows
                .iter()
                .map(|&row| InspectCell::Value(cells[row].clone()))
                .collect(),
            None => continue,
        };
        columns.insert(name.clone(), rendered);
    }

    Ok(InspectTable {
        index: rows.iter().map(|&row| table.index()[row].clone()).collect(),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_formats() {
        let options = InspectOptions::default();
        let value = Value::Number(4.0);
        assert_eq!(render(&value, true, &options), InspectCell::Value(value.clone()));
        assert_eq!(render(&value, false, &options), InspectCell::Flag(false));

        let inverted = InspectOptions {
            aberrant_format: CellFormat::Flag,
            other_value_format: CellFormat::Value,
            ..options
        };
        assert_eq!(render(&value, true, &inverted), InspectCell::Flag(true));
        assert_eq!(render(&value, false, &inverted), InspectCell::Value(value));
    }

    #[test]
    fn test_to_rows_has_header() {
        let mut columns = IndexMap::new();
        columns.insert("x".to_string(), vec![InspectCell::Flag(true)]);
        let table = InspectTable {
            index: vec![RowId::from("p1")],
            columns,
        };
        let rows = table.to_rows();
        assert_eq!(rows[0], vec!["".to_string(), "x".to_string()]);
        assert_eq!(rows[1], vec!["p1".to_string(), "true".to_string()]);
    }
}
