use crate::config::ReportLabels;
use crate::diff::{DiffEntry, ReconcileSummary, Reconciliation};
use crate::model::ColumnName;
use crate::normalize::NormalizedTable;
use schemars::JsonSchema;
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ReportRow {
    pub identifier: String,
    pub asset: String,
    pub differences: String,
}

/// Three-column table ready for rendering: identifier, asset, differences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct FlatReport {
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

pub fn to_flat_report(reconciliation: &Reconciliation, labels: &ReportLabels) -> FlatReport {
    FlatReport {
        columns: vec![
            reconciliation.identifier_column.clone(),
            reconciliation.asset_column.clone(),
            labels.differences.clone(),
        ],
        rows: reconciliation
            .entries
            .iter()
            .map(|entry| flatten_entry(entry, reconciliation, labels))
            .collect(),
    }
}

fn flatten_entry(
    entry: &DiffEntry,
    reconciliation: &Reconciliation,
    labels: &ReportLabels,
) -> ReportRow {
    ReportRow {
        identifier: entry.identifier.clone(),
        asset: entry.asset.clone(),
        differences: entry.summary(&reconciliation.label_a, &reconciliation.label_b, labels),
    }
}

/// Everything one comparison run hands to its caller.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ComparisonReport {
    pub summary: ReconcileSummary,
    pub flat: FlatReport,
    pub only_columns_a: Vec<ColumnName>,
    pub only_columns_b: Vec<ColumnName>,
    #[serde(skip)]
    pub reconciliation: Reconciliation,
    #[serde(skip)]
    pub table_a: NormalizedTable,
    #[serde(skip)]
    pub table_b: NormalizedTable,
    #[serde(skip)]
    pub labels: ReportLabels,
}

impl ComparisonReport {
    pub fn assemble(
        table_a: NormalizedTable,
        table_b: NormalizedTable,
        reconciliation: Reconciliation,
        labels: ReportLabels,
    ) -> Self {
        Self {
            summary: reconciliation.summary(),
            flat: to_flat_report(&reconciliation, &labels),
            only_columns_a: reconciliation.only_columns_a.clone(),
            only_columns_b: reconciliation.only_columns_b.clone(),
            reconciliation,
            table_a,
            table_b,
            labels,
        }
    }

    /// Rows that are missing on one side or differ in at least one column.
    pub fn rows_with_differences(&self) -> Vec<&ReportRow> {
        self.reconciliation
            .entries
            .iter()
            .zip(&self.flat.rows)
            .filter(|(entry, _)| entry.has_differences())
            .map(|(_, row)| row)
            .collect()
    }

    /// Plain-text rendering for the console.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;
        let _ = writeln!(
            out,
            "{} rows analysed: {} matched ({} with differences), {} only in {}, {} only in {}",
            s.rows_analysed,
            s.matched,
            s.with_differences,
            s.only_in_a,
            self.table_a.source(),
            s.only_in_b,
            self.table_b.source(),
        );
        if !self.only_columns_a.is_empty() {
            let _ = writeln!(
                out,
                "columns only in {}: {}",
                self.table_a.source(),
                self.only_columns_a.join(", ")
            );
        }
        if !self.only_columns_b.is_empty() {
            let _ = writeln!(
                out,
                "columns only in {}: {}",
                self.table_b.source(),
                self.only_columns_b.join(", ")
            );
        }
        for row in self.rows_with_differences() {
            let _ = writeln!(out, "{}\t{}\t{}", row.identifier, row.asset, row.differences);
        }
        out
    }
}
