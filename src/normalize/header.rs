//! Header resolution: collapses a multi-row header block into one flat,
//! unique column name per sheet column.
//!
//! Columns left of the boundary take the label row verbatim. Columns at or
//! right of the boundary are named `category - account - side`, where the
//! category and account rows are grouping labels that spreadsheets store
//! sparsely (a merged cell keeps its text in the first cell only). Those rows
//! are forward-filled as a separate pass before any name is composed.

use crate::config::HeaderLayout;
use crate::error::SchemaRule;
use crate::model::{CellValue, ColumnName};
use crate::utils::{column_number_to_name, normalize_whitespace};
use indexmap::IndexMap;

/// Joins the fragments of a composed column name.
pub const NAME_SEPARATOR: &str = " - ";

/// Replaces every empty position with the nearest non-empty value to its left.
///
/// Positions before the first non-empty value stay empty.
pub fn forward_fill(row: &[Option<String>]) -> Vec<Option<String>> {
    let mut last: Option<&String> = None;
    row.iter()
        .map(|cell| match cell {
            Some(text) => {
                last = Some(text);
                Some(text.clone())
            }
            None => last.cloned(),
        })
        .collect()
}

/// Resolves one column name per column index of the sheet.
pub fn resolve_column_names(
    header_block: &[Vec<Option<CellValue>>],
    column_count: usize,
    boundary_index: Option<usize>,
    layout: &HeaderLayout,
) -> Result<Vec<ColumnName>, SchemaRule> {
    let header_rows = header_block.len();
    let boundary = boundary_index.unwrap_or(column_count);
    if boundary > column_count {
        return Err(SchemaRule::BoundaryOutOfRange {
            boundary,
            columns: column_count,
        });
    }
    ensure_in_block("label", layout.label_row, header_rows)?;

    let mut names = Vec::with_capacity(column_count);
    let labels = &header_block[layout.label_row];
    for col in 0..boundary {
        let name = labels
            .get(col)
            .and_then(Option::as_ref)
            .map(CellValue::render)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| column_number_to_name(col as u32 + 1));
        names.push(name);
    }

    if boundary < column_count {
        ensure_in_block("category", layout.category_row, header_rows)?;
        ensure_in_block("account", layout.account_row, header_rows)?;
        if let Some(side_row) = layout.side_row {
            ensure_in_block("debit/credit", side_row, header_rows)?;
        }

        let mut categories = fragment_row(&header_block[layout.category_row], column_count);
        if layout.fill_category {
            categories = forward_fill(&categories);
        }
        let mut accounts = fragment_row(&header_block[layout.account_row], column_count);
        if layout.fill_account {
            accounts = forward_fill(&accounts);
        }
        let sides = layout
            .side_row
            .map(|row| fragment_row(&header_block[row], column_count));

        for col in boundary..column_count {
            let category = categories[col]
                .clone()
                .or_else(|| names.last().map(|previous| category_of(previous)))
                .unwrap_or_default();
            let account = accounts[col].clone().unwrap_or_default();
            let side = sides.as_ref().map(|row| row[col].clone().unwrap_or_default());
            names.push(compose_name(category, account, side));
        }
    }

    ensure_unique(&names)?;
    Ok(names)
}

/// The category portion of an already resolved name: its text before the first separator.
pub fn category_of(name: &str) -> String {
    name.split_once(NAME_SEPARATOR)
        .map(|(category, _)| category)
        .unwrap_or(name)
        .to_string()
}

/// Joins the fragments, dropping only empty trailing fragments.
fn compose_name(category: String, account: String, side: Option<String>) -> String {
    let mut fragments = vec![category, account];
    fragments.extend(side);
    while fragments.len() > 1 && fragments.last().is_some_and(String::is_empty) {
        fragments.pop();
    }
    fragments.join(NAME_SEPARATOR)
}

fn fragment_row(row: &[Option<CellValue>], column_count: usize) -> Vec<Option<String>> {
    (0..column_count)
        .map(|col| {
            row.get(col)
                .and_then(Option::as_ref)
                .map(|value| normalize_whitespace(&value.render()))
                .filter(|text| !text.is_empty())
        })
        .collect()
}

fn ensure_in_block(role: &'static str, row: usize, header_rows: usize) -> Result<(), SchemaRule> {
    if row < header_rows {
        Ok(())
    } else {
        Err(SchemaRule::HeaderRowOutsideBlock {
            role,
            row,
            header_rows,
        })
    }
}

fn ensure_unique(names: &[ColumnName]) -> Result<(), SchemaRule> {
    let mut seen: IndexMap<&str, usize> = IndexMap::with_capacity(names.len());
    for (col, name) in names.iter().enumerate() {
        if let Some(first) = seen.insert(name.as_str(), col) {
            return Err(SchemaRule::DuplicateColumn {
                name: name.clone(),
                first: column_number_to_name(first as u32 + 1),
                second: column_number_to_name(col as u32 + 1),
            });
        }
    }
    Ok(())
}
