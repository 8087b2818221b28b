#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sheet_reconcile::CellValue;
use tempfile::{TempDir, tempdir};
use umya_spreadsheet::{self, Spreadsheet, Worksheet};

/// A cell to place in a fixture grid.
#[derive(Debug, Clone)]
pub enum CellVal {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<&str> for CellVal {
    fn from(value: &str) -> Self {
        CellVal::Text(value.to_string())
    }
}

impl From<f64> for CellVal {
    fn from(value: f64) -> Self {
        CellVal::Number(value)
    }
}

impl From<i32> for CellVal {
    fn from(value: i32) -> Self {
        CellVal::Number(value as f64)
    }
}

impl From<bool> for CellVal {
    fn from(value: bool) -> Self {
        CellVal::Bool(value)
    }
}

/// Writes one cell; `col` and `row` are 1-based like spreadsheet coordinates.
pub fn set_cell(sheet: &mut Worksheet, col: u32, row: u32, value: &CellVal) {
    match value {
        CellVal::Empty => {}
        CellVal::Text(text) => {
            sheet.get_cell_mut((col, row)).set_value_string(text.as_str());
        }
        CellVal::Number(number) => {
            sheet.get_cell_mut((col, row)).set_value_number(*number);
        }
        CellVal::Bool(flag) => {
            sheet.get_cell_mut((col, row)).set_value_bool(*flag);
        }
    }
}

/// Fills the first sheet from a row-major grid.
pub fn fill_grid(book: &mut Spreadsheet, grid: &[Vec<CellVal>]) {
    let sheet = book.get_sheet_mut(&0).expect("default sheet");
    for (row_idx, row) in grid.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            set_cell(sheet, col_idx as u32 + 1, row_idx as u32 + 1, value);
        }
    }
}

pub fn workbook_bytes<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut Spreadsheet),
{
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    let mut out = std::io::Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out).expect("write workbook");
    out.into_inner()
}

pub fn grid_bytes(grid: &[Vec<CellVal>]) -> Vec<u8> {
    workbook_bytes(|book| fill_grid(book, grid))
}

pub fn read_back(bytes: &[u8]) -> Spreadsheet {
    umya_spreadsheet::reader::xlsx::read_reader(std::io::Cursor::new(bytes), true)
        .expect("read workbook")
}

/// Flat export with three header rows and `Vertrags-ID`, `Asset-ID` first.
pub fn flat_export(columns: &[&str], rows: &[Vec<CellVal>]) -> Vec<u8> {
    let mut grid = vec![
        columns.iter().map(|c| CellVal::from(*c)).collect::<Vec<_>>(),
        vec![CellVal::Text("generated report".into())],
        vec![CellVal::Text("as of 2024-12-31".into())],
    ];
    grid.extend(rows.iter().cloned());
    grid_bytes(&grid)
}

pub fn num(value: f64) -> Option<CellValue> {
    Some(CellValue::Number(value))
}

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, bytes).expect("write fixture");
        path
    }
}
