use crate::error::{ReconcileError, ReconcileResult};
use crate::model::{CellValue, RawSheet};
use crate::normalize::NormalizedTable;
use crate::report::ComparisonReport;
use crate::utils::{excel_serial_to_iso, is_date_format};
use std::io::Cursor;
use std::path::Path;
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// Excel rejects sheet names longer than this.
const MAX_SHEET_NAME_LEN: usize = 31;

/// Reads the first worksheet of an `.xlsx` byte stream into a [`RawSheet`].
pub fn read_first_sheet(bytes: &[u8], source: &str) -> ReconcileResult<RawSheet> {
    if bytes.is_empty() {
        return Err(ReconcileError::input(source, "workbook is empty"));
    }
    let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
        .map_err(|e| ReconcileError::input(source, e))?;
    let sheet = book
        .get_sheet_collection()
        .first()
        .ok_or_else(|| ReconcileError::input(source, "workbook contains no worksheet"))?;
    let raw = sheet_to_raw(sheet);
    if raw.row_count() == 0 {
        return Err(ReconcileError::input(source, "first worksheet is empty"));
    }
    tracing::debug!(
        input = source,
        sheet = raw.name(),
        rows = raw.row_count(),
        columns = raw.column_count(),
        "worksheet loaded"
    );
    Ok(raw)
}

pub fn sheet_to_raw(sheet: &Worksheet) -> RawSheet {
    let (max_col, max_row) = sheet.get_highest_column_and_row();
    let rows = (1..=max_row)
        .map(|row| {
            (1..=max_col)
                .map(|col| sheet.get_cell((col, row)).and_then(cell_to_value))
                .collect()
        })
        .collect();
    RawSheet::new(sheet.get_name(), rows)
}

/// Literal value of a cell; formulas are not evaluated, their cached result is used.
pub fn cell_to_value(cell: &umya_spreadsheet::Cell) -> Option<CellValue> {
    let raw = cell.get_value();
    if raw.is_empty() {
        return None;
    }
    match cell.get_data_type() {
        "s" | "str" | "inlineStr" => Some(CellValue::Text(raw.to_string())),
        "b" => Some(CellValue::Bool(raw == "1" || raw.eq_ignore_ascii_case("true"))),
        "e" => Some(CellValue::Error(raw.to_string())),
        _ => {
            if let Ok(number) = raw.parse::<f64>() {
                if let Some(date) = date_of(cell, number) {
                    return Some(CellValue::Date(date));
                }
                return Some(CellValue::Number(number));
            }
            let lower = raw.to_ascii_lowercase();
            if lower == "true" {
                return Some(CellValue::Bool(true));
            }
            if lower == "false" {
                return Some(CellValue::Bool(false));
            }
            Some(CellValue::Text(raw.to_string()))
        }
    }
}

/// ISO rendering of a numeric cell whose number format displays a date.
fn date_of(cell: &umya_spreadsheet::Cell, serial: f64) -> Option<String> {
    let format = cell.get_style().get_number_format()?;
    if !is_date_format(format.get_format_code()) {
        return None;
    }
    excel_serial_to_iso(serial)
}

/// Builds the export workbook: one cleaned sheet per input plus the comparison sheet.
pub fn write_report_workbook(report: &ComparisonReport) -> ReconcileResult<Vec<u8>> {
    let _span = tracing::info_span!("export").entered();
    let labels = &report.labels;

    let mut book = umya_spreadsheet::new_file();
    let first_name = sheet_name(&labels.cleaned_sheet_prefix, report.table_a.source());
    {
        let sheet = first_sheet_mut(&mut book)?;
        sheet.set_name(first_name);
        write_table(sheet, &report.table_a, &labels.key_column);
    }

    let second_name = sheet_name(&labels.cleaned_sheet_prefix, report.table_b.source());
    let sheet = book
        .new_sheet(second_name)
        .map_err(|e| ReconcileError::Export {
            reason: e.to_string(),
        })?;
    write_table(sheet, &report.table_b, &labels.key_column);

    let sheet = book
        .new_sheet(truncate_sheet_name(&labels.comparison_sheet))
        .map_err(|e| ReconcileError::Export {
            reason: e.to_string(),
        })?;
    for (col, header) in report.flat.columns.iter().enumerate() {
        sheet
            .get_cell_mut((col as u32 + 1, 1u32))
            .set_value_string(header.as_str());
    }
    for (idx, row) in report.flat.rows.iter().enumerate() {
        let row_num = idx as u32 + 2;
        sheet
            .get_cell_mut((1u32, row_num))
            .set_value_string(row.identifier.as_str());
        sheet
            .get_cell_mut((2u32, row_num))
            .set_value_string(row.asset.as_str());
        sheet
            .get_cell_mut((3u32, row_num))
            .set_value_string(row.differences.as_str());
    }

    let mut out = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out).map_err(|e| {
        ReconcileError::Export {
            reason: e.to_string(),
        }
    })?;
    let bytes = out.into_inner();
    tracing::info!(bytes = bytes.len(), "report workbook written");
    Ok(bytes)
}

pub fn write_report_to_path(report: &ComparisonReport, path: &Path) -> ReconcileResult<()> {
    let bytes = write_report_workbook(report)?;
    std::fs::write(path, bytes).map_err(|e| ReconcileError::Export {
        reason: format!("{}: {}", path.display(), e),
    })
}

fn first_sheet_mut(book: &mut Spreadsheet) -> ReconcileResult<&mut Worksheet> {
    book.get_sheet_mut(&0).ok_or_else(|| ReconcileError::Export {
        reason: "new workbook has no default worksheet".to_string(),
    })
}

/// Writes a one-row header (key column first) followed by the rows in sheet order.
fn write_table(sheet: &mut Worksheet, table: &NormalizedTable, key_column: &str) {
    sheet.get_cell_mut((1u32, 1u32)).set_value_string(key_column);
    for (idx, column) in table.columns().iter().enumerate() {
        sheet
            .get_cell_mut((idx as u32 + 2, 1u32))
            .set_value_string(column.as_str());
    }
    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_num = row_idx as u32 + 2;
        sheet
            .get_cell_mut((1u32, row_num))
            .set_value_string(row.key.as_str());
        for (col_idx, column) in table.columns().iter().enumerate() {
            if let Some(value) = row.get(column) {
                write_value(sheet, col_idx as u32 + 2, row_num, value);
            }
        }
    }
}

fn write_value(sheet: &mut Worksheet, col: u32, row: u32, value: &CellValue) {
    let cell = sheet.get_cell_mut((col, row));
    match value {
        CellValue::Number(number) => {
            cell.set_value_number(*number);
        }
        CellValue::Bool(flag) => {
            cell.set_value_bool(*flag);
        }
        CellValue::Text(text) | CellValue::Error(text) | CellValue::Date(text) => {
            cell.set_value_string(text.as_str());
        }
    }
}

fn sheet_name(prefix: &str, source: &str) -> String {
    truncate_sheet_name(&format!("{prefix} {source}"))
}

fn truncate_sheet_name(name: &str) -> String {
    name.chars().take(MAX_SHEET_NAME_LEN).collect()
}
