use crate::model::{CellValue, ColumnName};
use crate::normalize::NormalizedRow;
use schemars::JsonSchema;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct CellMismatch {
    pub column: ColumnName,
    pub value_a: Option<CellValue>,
    pub value_b: Option<CellValue>,
}

/// Null-aware exact equality: two nulls are equal, a null never equals a
/// value, and values compare without type coercion or numeric tolerance.
pub fn values_equal(a: Option<&CellValue>, b: Option<&CellValue>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Compares two rows over `columns`, in that order.
pub fn compare_rows(
    a: &NormalizedRow,
    b: &NormalizedRow,
    columns: &[ColumnName],
) -> Vec<CellMismatch> {
    columns
        .iter()
        .filter_map(|column| {
            let value_a = a.get(column);
            let value_b = b.get(column);
            if values_equal(value_a, value_b) {
                None
            } else {
                Some(CellMismatch {
                    column: column.clone(),
                    value_a: value_a.cloned(),
                    value_b: value_b.cloned(),
                })
            }
        })
        .collect()
}
