pub mod compare;

use crate::config::ReportLabels;
use crate::model::{CellValue, ColumnName};
use crate::normalize::{CompositeKey, NormalizedTable};
use compare::{CellMismatch, compare_rows};
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    OnlyInA,
    OnlyInB,
    Matched { mismatches: Vec<CellMismatch> },
}

/// Result for one composite key of the union of both inputs.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct DiffEntry {
    pub key: CompositeKey,
    pub identifier: String,
    pub asset: String,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

impl DiffEntry {
    pub fn has_differences(&self) -> bool {
        match &self.outcome {
            RowOutcome::Matched { mismatches } => !mismatches.is_empty(),
            RowOutcome::OnlyInA | RowOutcome::OnlyInB => true,
        }
    }

    /// One-line description: a presence marker, the no-difference sentinel,
    /// or `column: A=x / B=y` descriptors joined by `"; "`.
    pub fn summary(&self, label_a: &str, label_b: &str, labels: &ReportLabels) -> String {
        match &self.outcome {
            RowOutcome::OnlyInA => format!("{} {}", labels.only_in, label_a),
            RowOutcome::OnlyInB => format!("{} {}", labels.only_in, label_b),
            RowOutcome::Matched { mismatches } if mismatches.is_empty() => {
                labels.no_differences.clone()
            }
            RowOutcome::Matched { mismatches } => mismatches
                .iter()
                .map(|m| {
                    format!(
                        "{}: {}={} / {}={}",
                        m.column,
                        label_a,
                        render_or(m.value_a.as_ref(), &labels.empty_value),
                        label_b,
                        render_or(m.value_b.as_ref(), &labels.empty_value),
                    )
                })
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

fn render_or(value: Option<&CellValue>, empty: &str) -> String {
    value.map(CellValue::render).unwrap_or_else(|| empty.to_string())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ReconcileSummary {
    pub rows_analysed: usize,
    pub matched: usize,
    pub with_differences: usize,
    pub only_in_a: usize,
    pub only_in_b: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Reconciliation {
    pub label_a: String,
    pub label_b: String,
    pub identifier_column: ColumnName,
    pub asset_column: ColumnName,
    pub entries: Vec<DiffEntry>,
    /// Columns compared on matched rows, in lexicographic order.
    pub comparable_columns: Vec<ColumnName>,
    /// Columns only table A has, in A's schema order.
    pub only_columns_a: Vec<ColumnName>,
    /// Columns only table B has, in B's schema order.
    pub only_columns_b: Vec<ColumnName>,
}

impl Reconciliation {
    pub fn summary(&self) -> ReconcileSummary {
        let mut summary = ReconcileSummary {
            rows_analysed: self.entries.len(),
            ..Default::default()
        };
        for entry in &self.entries {
            match &entry.outcome {
                RowOutcome::OnlyInA => summary.only_in_a += 1,
                RowOutcome::OnlyInB => summary.only_in_b += 1,
                RowOutcome::Matched { mismatches } => {
                    summary.matched += 1;
                    if !mismatches.is_empty() {
                        summary.with_differences += 1;
                    }
                }
            }
        }
        summary
    }
}

/// Full outer join of `a` and `b` on the composite key, diffing common columns of matched rows.
///
/// Output order is the lexicographic order of the keys, independent of
/// either table's row order.
pub fn reconcile(a: &NormalizedTable, b: &NormalizedTable) -> Reconciliation {
    let _span = tracing::info_span!("reconcile", a = a.source(), b = b.source()).entered();

    let keys: BTreeSet<&CompositeKey> = a.keys().chain(b.keys()).collect();
    let comparable_columns = comparable_columns(a, b);
    let only_columns_a = exclusive_columns(a, b);
    let only_columns_b = exclusive_columns(b, a);
    if !only_columns_a.is_empty() || !only_columns_b.is_empty() {
        tracing::warn!(
            only_in_a = ?only_columns_a,
            only_in_b = ?only_columns_b,
            "schemas differ"
        );
    }

    let entries: Vec<DiffEntry> = keys
        .into_iter()
        .map(|key| match (a.get(key), b.get(key)) {
            (Some(row_a), Some(row_b)) => DiffEntry {
                key: key.clone(),
                identifier: row_a.identifier.clone(),
                asset: row_a.asset.clone(),
                outcome: RowOutcome::Matched {
                    mismatches: compare_rows(row_a, row_b, &comparable_columns),
                },
            },
            (Some(row), None) => DiffEntry {
                key: key.clone(),
                identifier: row.identifier.clone(),
                asset: row.asset.clone(),
                outcome: RowOutcome::OnlyInA,
            },
            (None, Some(row)) => DiffEntry {
                key: key.clone(),
                identifier: row.identifier.clone(),
                asset: row.asset.clone(),
                outcome: RowOutcome::OnlyInB,
            },
            (None, None) => unreachable!("key {key} comes from one of the tables"),
        })
        .collect();

    let reconciliation = Reconciliation {
        label_a: a.source().to_string(),
        label_b: b.source().to_string(),
        identifier_column: a.identifier_column().to_string(),
        asset_column: a.asset_column().to_string(),
        entries,
        comparable_columns,
        only_columns_a,
        only_columns_b,
    };
    let summary = reconciliation.summary();
    tracing::info!(
        rows = summary.rows_analysed,
        matched = summary.matched,
        with_differences = summary.with_differences,
        only_in_a = summary.only_in_a,
        only_in_b = summary.only_in_b,
        "reconciliation complete"
    );
    reconciliation
}

fn key_columns(table: &NormalizedTable) -> [&str; 2] {
    [table.identifier_column(), table.asset_column()]
}

fn comparable_columns(a: &NormalizedTable, b: &NormalizedTable) -> Vec<ColumnName> {
    let excluded: HashSet<&str> = key_columns(a).into_iter().chain(key_columns(b)).collect();
    let in_b: HashSet<&str> = b.columns().iter().map(String::as_str).collect();
    a.columns()
        .iter()
        .filter(|column| in_b.contains(column.as_str()) && !excluded.contains(column.as_str()))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn exclusive_columns(table: &NormalizedTable, other: &NormalizedTable) -> Vec<ColumnName> {
    let excluded: HashSet<&str> = key_columns(table).into_iter().collect();
    table
        .columns()
        .iter()
        .filter(|column| !other.has_column(column) && !excluded.contains(column.as_str()))
        .cloned()
        .collect()
}
