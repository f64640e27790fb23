//! In-memory tabular data shared by detection results.
//!
//! A [`Table`] is an ordered index of row identifiers plus ordered, named
//! columns of cells. Results hold it behind an `Arc` and never mutate it;
//! remediation works on an owned copy.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::{OutlierError, Result};

/// Identifier of a row (participant) in a table index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    /// Integer identifier, the default when no identifier column is given
    Int(i64),
    /// Textual identifier such as "P12"
    Label(String),
}

impl RowId {
    /// Stable string form used when comparing identifiers of mixed types.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self::Label(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        Self::Label(value)
    }
}

impl From<&String> for RowId {
    fn from(value: &String) -> Self {
        Self::Label(value.clone())
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for RowId {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for RowId {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<&RowId> for RowId {
    fn from(value: &RowId) -> Self {
        value.clone()
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric cell; NaN is treated as missing
    Number(f64),
    /// Free text (untested columns, or numbers awaiting coercion)
    Text(String),
    /// Missing cell
    Missing,
}

impl Value {
    /// Numeric view of the cell. Missing, NaN and text cells yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) if !value.is_nan() => Some(*value),
            _ => None,
        }
    }

    /// Whether the cell holds no usable value
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Number(value) => value.is_nan(),
            Self::Text(_) => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) if value.is_nan() => f.write_str("NaN"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Missing => f.write_str("NaN"),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

/// Wire layout of a table: an optional index and ordered columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<Vec<RowId>>,
    columns: IndexMap<String, Vec<Value>>,
}

/// Ordered rows × named columns, indexed by [`RowId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTable", into = "RawTable")]
pub struct Table {
    index: Vec<RowId>,
    columns: IndexMap<String, Vec<Value>>,
    lookup: HashMap<RowId, usize>,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.columns == other.columns
    }
}

impl TryFrom<RawTable> for Table {
    type Error = OutlierError;

    fn try_from(raw: RawTable) -> Result<Self> {
        match raw.index {
            Some(index) => Table::new(index, raw.columns),
            None => Table::from_columns(raw.columns),
        }
    }
}

impl From<Table> for RawTable {
    fn from(table: Table) -> Self {
        RawTable {
            index: Some(table.index),
            columns: table.columns,
        }
    }
}

impl Table {
    /// Build a table from an explicit index and ordered columns.
    pub fn new(index: Vec<RowId>, columns: IndexMap<String, Vec<Value>>) -> Result<Self> {
        for (name, cells) in &columns {
            if cells.len() != index.len() {
                return Err(OutlierError::invalid_value(
                    format!(
                        "column '{name}' has {} cells but the index has {} rows",
                        cells.len(),
                        index.len()
                    ),
                    name.clone(),
                    cells.len(),
                ));
            }
        }

        let mut lookup = HashMap::with_capacity(index.len());
        for (position, id) in index.iter().enumerate() {
            if lookup.insert(id.clone(), position).is_some() {
                return Err(OutlierError::invalid_value(
                    "duplicate row identifier in index",
                    "index",
                    id,
                ));
            }
        }

        Ok(Self {
            index,
            columns,
            lookup,
        })
    }

    /// Build a table whose index is the row number `0..n`.
    pub fn from_columns(columns: IndexMap<String, Vec<Value>>) -> Result<Self> {
        let rows = columns.values().next().map_or(0, Vec::len);
        let index = (0..rows).map(RowId::from).collect();
        Self::new(index, columns)
    }

    /// Convenience constructor for purely numeric data.
    pub fn from_numeric<S: Into<String>>(columns: Vec<(S, Vec<f64>)>) -> Result<Self> {
        let columns = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values.into_iter().map(Value::Number).collect()))
            .collect();
        Self::from_columns(columns)
    }

    /// Promote a column to the row index, removing it from the columns.
    pub fn with_index_column(mut self, name: &str) -> Result<Self> {
        let cells = self
            .columns
            .shift_remove(name)
            .ok_or_else(|| OutlierError::column_not_found_in(name, "identifier column"))?;

        let index = cells
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Value::Number(value) if value.is_finite() && value.fract() == 0.0 => {
                    Ok(RowId::Int(value as i64))
                }
                Value::Number(value) if !value.is_nan() => Ok(RowId::Label(value.to_string())),
                Value::Text(text) => Ok(RowId::Label(text)),
                _ => Err(OutlierError::invalid_value(
                    format!("identifier column '{name}' has a missing value"),
                    name,
                    row,
                )),
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(index, self.columns)
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    /// Row identifiers in table order
    pub fn index(&self) -> &[RowId] {
        &self.index
    }

    /// Column names in table order
    pub fn column_names(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }

    /// Whether the table has a column with this name
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Cells of a column
    pub fn column(&self, name: &str) -> Result<&[Value]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| OutlierError::column_not_found(name))
    }

    /// Numeric view of a column: one entry per row, `None` where missing.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.column(name)?.iter().map(Value::as_f64).collect())
    }

    /// Cell at (row position, column)
    pub fn cell(&self, position: usize, column: &str) -> Result<&Value> {
        self.column(column)?
            .get(position)
            .ok_or_else(|| OutlierError::internal(format!("row position {position} out of range")))
    }

    /// Position of an identifier. Falls back to comparing string forms so
    /// `"3"` resolves against an integer index entry `3`.
    pub fn position_of(&self, id: &RowId) -> Option<usize> {
        if let Some(&position) = self.lookup.get(id) {
            return Some(position);
        }
        let key = id.key();
        self.index.iter().position(|candidate| candidate.key() == key)
    }

    /// Resolve an identifier to the canonical entry stored in the index.
    pub fn resolve(&self, id: &RowId) -> Result<RowId> {
        self.position_of(id)
            .map(|position| self.index[position].clone())
            .ok_or_else(|| OutlierError::identifier_not_found(id))
    }

    /// Sorted positions of the given identifiers.
    pub fn positions<'a, I>(&self, ids: I) -> Result<Vec<usize>>
    where
        I: IntoIterator<Item = &'a RowId>,
    {
        let mut positions = ids
            .into_iter()
            .map(|id| {
                self.position_of(id)
                    .ok_or_else(|| OutlierError::identifier_not_found(id))
            })
            .collect::<Result<Vec<_>>>()?;
        positions.sort_unstable();
        Ok(positions)
    }

    /// Overwrite a single cell.
    pub fn set(&mut self, position: usize, column: &str, value: Value) -> Result<()> {
        let cells = self
            .columns
            .get_mut(column)
            .ok_or_else(|| OutlierError::column_not_found(column))?;
        let cell = cells
            .get_mut(position)
            .ok_or_else(|| OutlierError::internal(format!("row position {position} out of range")))?;
        *cell = value;
        Ok(())
    }

    /// Mutable access to a whole column.
    pub fn column_mut(&mut self, name: &str) -> Result<&mut Vec<Value>> {
        self.columns
            .get_mut(name)
            .ok_or_else(|| OutlierError::column_not_found(name))
    }

    /// A copy of the table without the rows at the given positions.
    pub fn without_positions(&self, drop: &[usize]) -> Result<Self> {
        let mut keep = vec![true; self.n_rows()];
        for &position in drop {
            if let Some(flag) = keep.get_mut(position) {
                *flag = false;
            }
        }

        let index = self
            .index
            .iter()
            .zip(&keep)
            .filter(|(_, kept)| **kept)
            .map(|(id, _)| id.clone())
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, cells)| {
                let kept = cells
                    .iter()
                    .zip(&keep)
                    .filter(|(_, kept)| **kept)
                    .map(|(cell, _)| cell.clone())
                    .collect();
                (name.clone(), kept)
            })
            .collect();

        Self::new(index, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut columns = IndexMap::new();
        columns.insert(
            "id".to_string(),
            vec![Value::from("P1"), Value::from("P2"), Value::from("P3")],
        );
        columns.insert(
            "rt".to_string(),
            vec![Value::Number(1.0), Value::Missing, Value::Number(3.0)],
        );
        Table::from_columns(columns).unwrap()
    }

    #[test]
    fn test_default_index_is_row_number() {
        let table = sample();
        assert_eq!(table.index(), &[RowId::Int(0), RowId::Int(1), RowId::Int(2)]);
        assert_eq!(table.n_rows(), 3);
    }

    #[test]
    fn test_with_index_column_moves_column_into_index() {
        let table = sample().with_index_column("id").unwrap();
        assert_eq!(table.index()[1], RowId::from("P2"));
        assert!(!table.has_column("id"));
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["rt"]);
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let mut columns = IndexMap::new();
        columns.insert("x".to_string(), vec![Value::Number(1.0), Value::Number(2.0)]);
        let err = Table::new(vec![RowId::from("a"), RowId::from("a")], columns).unwrap_err();
        assert!(matches!(err, OutlierError::Validation { .. }));
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let mut columns = IndexMap::new();
        columns.insert("x".to_string(), vec![Value::Number(1.0)]);
        let err = Table::new(vec![RowId::Int(0), RowId::Int(1)], columns).unwrap_err();
        assert!(matches!(err, OutlierError::Validation { .. }));
    }

    #[test]
    fn test_numeric_view_marks_missing() {
        let table = sample();
        assert_eq!(table.numeric("rt").unwrap(), vec![Some(1.0), None, Some(3.0)]);
        assert!(matches!(
            table.numeric("nope"),
            Err(OutlierError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_position_lookup_by_string_form() {
        let table = sample();
        assert_eq!(table.position_of(&RowId::from("2")), Some(2));
        assert_eq!(table.resolve(&RowId::from("1")).unwrap(), RowId::Int(1));
        assert!(matches!(
            table.resolve(&RowId::from("P9")),
            Err(OutlierError::IdentifierNotFound { .. })
        ));
    }

    #[test]
    fn test_without_positions_keeps_order() {
        let table = sample().without_positions(&[1]).unwrap();
        assert_eq!(table.index(), &[RowId::Int(0), RowId::Int(2)]);
        assert_eq!(table.numeric("rt").unwrap(), vec![Some(1.0), Some(3.0)]);
    }

    #[test]
    fn test_json_layout_preserves_column_order() {
        let json = r#"{"columns": {"b": [1, 2], "a": ["x", null]}}"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(table.column("a").unwrap()[1], Value::Missing);

        let round = serde_json::to_string(&table).unwrap();
        let again: Table = serde_json::from_str(&round).unwrap();
        assert_eq!(table, again);
    }
}
