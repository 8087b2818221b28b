use assert_matches::assert_matches;
use sheet_reconcile::{
    AppConfig, CellValue, CliArgs, NormalizeConfig, ReconcileError, ReportLabels, RowOutcome,
    SchemaRule, compare_workbooks, normalize, reconcile, run_comparison, to_flat_report,
};

mod support;

use support::{CellVal, flat_export, grid_bytes, read_back};

const FLAT_COLUMNS: &[&str] = &["Vertrags-ID", "Asset-ID", "Amount"];

fn row(id: i32, asset: i32, amount: i32) -> Vec<CellVal> {
    vec![id.into(), asset.into(), amount.into()]
}

fn compare(test: &[u8], prod: &[u8], a: &str, b: &str) -> sheet_reconcile::ComparisonReport {
    compare_workbooks(
        test,
        prod,
        &NormalizeConfig::default(),
        a,
        b,
        &ReportLabels::english(),
    )
    .expect("comparison failed")
}

#[test]
fn row_only_in_second_input_is_presence_only() {
    let test = flat_export(FLAT_COLUMNS, &[row(1, 10, 100)]);
    let prod = flat_export(FLAT_COLUMNS, &[row(1, 10, 100), row(2, 20, 50)]);

    let report = compare(&test, &prod, "A", "B");

    assert_eq!(report.flat.rows.len(), 2);
    assert_eq!(report.flat.rows[0].identifier, "1");
    assert_eq!(report.flat.rows[0].asset, "10");
    assert_eq!(report.flat.rows[0].differences, "no differences");
    assert_eq!(report.flat.rows[1].identifier, "2");
    assert_eq!(report.flat.rows[1].asset, "20");
    assert_eq!(report.flat.rows[1].differences, "only in B");
    assert_eq!(report.reconciliation.entries[1].outcome, RowOutcome::OnlyInB);
}

#[test]
fn changed_amount_is_described_with_both_values() {
    let test = flat_export(FLAT_COLUMNS, &[row(1, 10, 100)]);
    let prod = flat_export(FLAT_COLUMNS, &[row(1, 10, 200)]);

    let report = compare(&test, &prod, "Test", "Prod");

    assert_eq!(report.flat.rows.len(), 1);
    assert_eq!(
        report.flat.rows[0].differences,
        "Amount: Test=100 / Prod=200"
    );
    assert_eq!(report.summary.with_differences, 1);
    assert_eq!(report.rows_with_differences().len(), 1);
}

#[test]
fn column_missing_on_one_side_is_a_schema_discrepancy() {
    let test = flat_export(
        &["Vertrags-ID", "Asset-ID", "Amount", "Fee"],
        &[vec![1.into(), 10.into(), 100.into(), 7.into()]],
    );
    let prod = flat_export(FLAT_COLUMNS, &[row(1, 10, 100)]);

    let report = compare(&test, &prod, "Test", "Prod");

    assert_eq!(report.only_columns_a, vec!["Fee"]);
    assert!(report.only_columns_b.is_empty());
    assert!(!report.reconciliation.comparable_columns.contains(&"Fee".to_string()));
    assert_eq!(report.flat.rows[0].differences, "no differences");
}

#[test]
fn numeric_and_text_identifiers_match_across_inputs() {
    let test = flat_export(FLAT_COLUMNS, &[vec![101.into(), "X".into(), 5.into()]]);
    let prod = flat_export(FLAT_COLUMNS, &[vec!["101".into(), "X".into(), 5.into()]]);

    let report = compare(&test, &prod, "Test", "Prod");

    assert_eq!(report.flat.rows.len(), 1);
    assert_eq!(report.reconciliation.entries[0].key.as_str(), "101_X");
    assert_eq!(report.flat.rows[0].differences, "no differences");
}

#[test]
fn empty_cells_on_both_sides_are_equal() {
    let test = flat_export(
        &["Vertrags-ID", "Asset-ID", "Amount", "Note"],
        &[vec![1.into(), 10.into(), CellVal::Empty, "x".into()]],
    );
    let prod = flat_export(
        &["Vertrags-ID", "Asset-ID", "Amount", "Note"],
        &[vec![1.into(), 10.into(), CellVal::Empty, CellVal::Empty]],
    );

    let report = compare(&test, &prod, "Test", "Prod");

    assert_eq!(report.flat.rows[0].differences, "Note: Test=x / Prod=(empty)");
}

#[test]
fn hierarchical_header_resolves_grouped_columns() {
    let header = vec![
        vec![
            CellVal::Empty,
            CellVal::Empty,
            CellVal::Empty,
            "Umsatz\nErlöse".into(),
            CellVal::Empty,
            "Kosten".into(),
            CellVal::Empty,
        ],
        vec![
            CellVal::Empty,
            CellVal::Empty,
            CellVal::Empty,
            4000.into(),
            CellVal::Empty,
            6000.into(),
            CellVal::Empty,
        ],
        vec![
            CellVal::Empty,
            CellVal::Empty,
            CellVal::Empty,
            "Soll".into(),
            "Haben".into(),
            "Soll".into(),
            "Haben".into(),
        ],
        vec![
            "Vertrags-ID".into(),
            "Asset-ID".into(),
            "Währung".into(),
            CellVal::Empty,
            CellVal::Empty,
            CellVal::Empty,
            CellVal::Empty,
        ],
    ];
    let mut test_grid = header.clone();
    test_grid.push(vec![
        7.into(),
        "A-1".into(),
        "EUR".into(),
        10.into(),
        0.into(),
        3.into(),
        0.into(),
    ]);
    let mut prod_grid = header;
    prod_grid.push(vec![
        7.into(),
        "A-1".into(),
        "EUR".into(),
        10.into(),
        0.into(),
        4.into(),
        0.into(),
    ]);

    let config = NormalizeConfig::hierarchical(4, 3);
    let test = normalize(&grid_bytes(&test_grid), &config, "Test").unwrap();
    let prod = normalize(&grid_bytes(&prod_grid), &config, "Prod").unwrap();

    assert_eq!(
        test.columns(),
        [
            "Vertrags-ID",
            "Asset-ID",
            "Währung",
            "Umsatz Erlöse - 4000 - Soll",
            "Umsatz Erlöse - 4000 - Haben",
            "Kosten - 6000 - Soll",
            "Kosten - 6000 - Haben",
        ]
    );

    let reconciliation = reconcile(&test, &prod);
    let flat = to_flat_report(&reconciliation, &ReportLabels::english());
    assert_eq!(flat.rows[0].identifier, "7");
    assert_eq!(flat.rows[0].asset, "A-1");
    assert_eq!(flat.rows[0].differences, "Kosten - 6000 - Soll: Test=3 / Prod=4");
}

#[test]
fn german_labels_localize_report() {
    let test = flat_export(FLAT_COLUMNS, &[row(1, 10, 100), row(3, 30, 1)]);
    let prod = flat_export(FLAT_COLUMNS, &[row(1, 10, 100), row(2, 20, 50)]);

    let report = compare_workbooks(
        &test,
        &prod,
        &NormalizeConfig::default(),
        "Test",
        "Prod",
        &ReportLabels::german(),
    )
    .unwrap();

    let differences: Vec<&str> = report
        .flat
        .rows
        .iter()
        .map(|row| row.differences.as_str())
        .collect();
    assert_eq!(differences, vec!["Keine", "Nur in Prod", "Nur in Test"]);
    assert_eq!(
        report.flat.columns,
        vec!["Vertrags-ID", "Asset-ID", "Unterschiede"]
    );
}

#[test]
fn unreadable_workbook_names_its_input() {
    let prod = flat_export(FLAT_COLUMNS, &[row(1, 10, 100)]);
    let err = compare_workbooks(
        b"definitely not xlsx",
        &prod,
        &NormalizeConfig::default(),
        "Test",
        "Prod",
        &ReportLabels::english(),
    )
    .unwrap_err();
    assert_matches!(err, ReconcileError::Input { ref input, .. } if input == "Test");
}

#[test]
fn missing_asset_column_names_its_input() {
    let test = flat_export(FLAT_COLUMNS, &[row(1, 10, 100)]);
    let prod = flat_export(&["Vertrags-ID", "Asset", "Amount"], &[row(1, 10, 100)]);
    let err = compare_workbooks(
        &test,
        &prod,
        &NormalizeConfig::default(),
        "Test",
        "Prod",
        &ReportLabels::english(),
    )
    .unwrap_err();
    assert_matches!(
        err,
        ReconcileError::Schema {
            ref input,
            rule: SchemaRule::MissingColumn { ref label },
        } if input == "Prod" && label == "Asset-ID"
    );
}

#[test]
fn header_only_inputs_reconcile_to_nothing() {
    let test = flat_export(FLAT_COLUMNS, &[]);
    let prod = flat_export(FLAT_COLUMNS, &[row(1, 10, 100)]);

    let report = compare(&test, &prod, "Test", "Prod");

    assert!(report.table_a.is_empty());
    assert_eq!(report.flat.rows[0].differences, "only in Prod");
}

#[test]
fn run_comparison_exports_cleaned_inputs_and_comparison() {
    let workspace = support::TestWorkspace::new();
    let test_path = workspace.write(
        "test.xlsx",
        &flat_export(FLAT_COLUMNS, &[row(1, 10, 100), row(2, 20, 5)]),
    );
    let prod_path = workspace.write("prod.xlsx", &flat_export(FLAT_COLUMNS, &[row(1, 10, 200)]));
    let output = workspace.path("comparison.xlsx");

    let config = AppConfig::from_args(CliArgs {
        test: Some(test_path),
        prod: Some(prod_path),
        output: Some(output.clone()),
        ..Default::default()
    })
    .unwrap();
    config.validate().unwrap();

    let report = run_comparison(&config).unwrap();
    assert_eq!(report.summary.rows_analysed, 2);

    let book = read_back(&std::fs::read(&output).unwrap());
    let names: Vec<String> = book
        .get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect();
    assert_eq!(names, vec!["Cleaned Test", "Cleaned Prod", "Comparison"]);

    let cleaned = book.get_sheet_by_name("Cleaned Test").unwrap();
    assert_eq!(cleaned.get_value("A1"), "Key");
    assert_eq!(cleaned.get_value("B1"), "Vertrags-ID");
    assert_eq!(cleaned.get_value("A2"), "1_10");
    assert_eq!(cleaned.get_value("D2"), "100");
    assert_eq!(cleaned.get_value("A3"), "2_20");

    let comparison = book.get_sheet_by_name("Comparison").unwrap();
    assert_eq!(comparison.get_value("C1"), "differences");
    assert_eq!(comparison.get_value("C2"), "Amount: Test=100 / Prod=200");
    assert_eq!(comparison.get_value("C3"), "only in Test");
}

#[test]
fn cleaned_sheet_keeps_numbers_numeric() {
    let test = flat_export(FLAT_COLUMNS, &[row(1, 10, 100)]);
    let report = compare(&test, &test, "Test", "Prod");
    let bytes = sheet_reconcile::workbook::write_report_workbook(&report).unwrap();
    let raw = sheet_reconcile::workbook::read_first_sheet(&bytes, "export").unwrap();
    assert_eq!(raw.cell(1, 3), Some(&CellValue::Number(100.0)));
    assert_eq!(raw.cell(1, 0), Some(&CellValue::Text("1_10".into())));
}

fn dated_export(serial: f64) -> Vec<u8> {
    support::workbook_bytes(|book| {
        support::fill_grid(
            book,
            &[
                vec!["Vertrags-ID".into(), "Asset-ID".into(), "Datum".into()],
                vec!["generated report".into()],
                vec!["as of 2024-12-31".into()],
                vec![1.into(), 10.into(), serial.into()],
            ],
        );
        let sheet = book.get_sheet_mut(&0).expect("default sheet");
        sheet
            .get_style_mut("C4")
            .get_number_format_mut()
            .set_format_code("dd.mm.yyyy");
    })
}

#[test]
fn date_cells_are_compared_and_described_as_dates() {
    let report = compare(&dated_export(45657.0), &dated_export(45658.0), "Test", "Prod");

    assert_eq!(
        report.flat.rows[0].differences,
        "Datum: Test=2024-12-31 / Prod=2025-01-01"
    );
}

#[test]
fn blank_workbook_is_an_input_error() {
    let err = normalize(&grid_bytes(&[]), &NormalizeConfig::default(), "Test").unwrap_err();
    assert_matches!(err, ReconcileError::Input { ref input, .. } if input == "Test");
    assert_eq!(err.code(), sheet_reconcile::ErrorCode::InputError);
}
