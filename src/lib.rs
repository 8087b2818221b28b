pub mod config;
pub mod diff;
pub mod error;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod report;
pub mod utils;
pub mod workbook;

pub use config::{
    AppConfig, CliArgs, DuplicateKeyPolicy, HeaderLayout, Language, NormalizeConfig,
    OutputFormat, ReportLabels,
};
pub use diff::{DiffEntry, ReconcileSummary, Reconciliation, RowOutcome, reconcile};
pub use error::{ErrorCode, KeyCollisionWarning, ReconcileError, ReconcileResult, SchemaRule};
pub use logging::{LoggingConfig, init_logging};
pub use model::{CellValue, ColumnName, RawSheet};
pub use normalize::{CompositeKey, NormalizedRow, NormalizedTable, TableBuilder, normalize};
pub use report::{ComparisonReport, FlatReport, ReportRow, to_flat_report};

use anyhow::{Context, Result};
use std::time::Instant;

/// Normalizes both workbooks and reconciles them.
///
/// Each call is independent: nothing is cached or shared between runs.
pub fn compare_workbooks(
    test_bytes: &[u8],
    prod_bytes: &[u8],
    config: &NormalizeConfig,
    test_label: &str,
    prod_label: &str,
    labels: &ReportLabels,
) -> ReconcileResult<ComparisonReport> {
    let table_a = normalize(test_bytes, config, test_label)?;
    let table_b = normalize(prod_bytes, config, prod_label)?;
    let reconciliation = reconcile(&table_a, &table_b);
    Ok(ComparisonReport::assemble(
        table_a,
        table_b,
        reconciliation,
        labels.clone(),
    ))
}

/// Runs one comparison from files on disk and writes the export workbook when configured.
pub fn run_comparison(config: &AppConfig) -> Result<ComparisonReport> {
    let span = logging::comparison_span(&config.test_label, &config.prod_label);
    let _entered = span.enter();
    let started = Instant::now();

    let test_bytes = std::fs::read(&config.test_path)
        .with_context(|| format!("failed to read {:?}", config.test_path))?;
    let prod_bytes = std::fs::read(&config.prod_path)
        .with_context(|| format!("failed to read {:?}", config.prod_path))?;

    let report = compare_workbooks(
        &test_bytes,
        &prod_bytes,
        &config.normalize,
        &config.test_label,
        &config.prod_label,
        &config.labels,
    )?;

    if let Some(path) = config.output_path.as_deref() {
        workbook::write_report_to_path(&report, path)
            .with_context(|| format!("failed to export comparison to {:?}", path))?;
        tracing::info!(path = %path.display(), "comparison exported");
    }

    crate::log_slow_operation!(
        started.elapsed(),
        5_000,
        rows = report.summary.rows_analysed,
        "comparison finished"
    );
    Ok(report)
}
