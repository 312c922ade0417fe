//! The tabular result handed back to the report layer.

use serde::{Deserialize, Serialize};

use crate::model::{DataType, Member, Value};

/// One output column: dimension levels first, measures after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// One result cell: a resolved member in a dimension column, a typed
/// value in a measure column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Member(Member),
    Value(Value),
}

impl Cell {
    /// Display text, as a report cell shows it.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Member(m) => m.caption.clone(),
            Cell::Value(v) => v.as_text(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Value(Value::Null))
    }
}

/// Column headers, typed columns, and rows of resolved cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl TabularResult {
    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// The cell at (row, column), if in range.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }
}
