use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A column name after header resolution.
pub type ColumnName = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
    /// Date-formatted numeric cell, as `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.
    Date(String),
}

impl CellValue {
    /// Canonical, locale-independent rendering used for keys, summaries and exports.
    pub fn render(&self) -> String {
        match self {
            CellValue::Text(text) => text.clone(),
            CellValue::Number(number) => crate::utils::format_number(*number),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Error(literal) | CellValue::Date(literal) => literal.clone(),
        }
    }

}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// The first worksheet of a workbook as a dense grid, without any header interpretation.
///
/// Row and column indices are zero-based; every row has exactly `column_count` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSheet {
    name: String,
    rows: Vec<Vec<Option<CellValue>>>,
    column_count: usize,
}

impl RawSheet {
    /// Builds a sheet from ragged rows, padding short rows with empty cells.
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Option<CellValue>>>) -> Self {
        let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(column_count, None);
                row
            })
            .collect();
        Self {
            name: name.into(),
            rows,
            column_count,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn rows(&self) -> &[Vec<Option<CellValue>>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(Option::as_ref)
    }

    /// Splits the grid into the header block and the data rows that follow it.
    pub fn split_header(
        &self,
        header_rows: usize,
    ) -> (&[Vec<Option<CellValue>>], &[Vec<Option<CellValue>>]) {
        let split = header_rows.min(self.rows.len());
        self.rows.split_at(split)
    }
}
