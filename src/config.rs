use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_HEADER_ROWS: usize = 3;
const DEFAULT_IDENTIFIER_LABEL: &str = "Vertrags-ID";
const DEFAULT_ASSET_LABEL: &str = "Asset-ID";
const DEFAULT_TEST_LABEL: &str = "Test";
const DEFAULT_PROD_LABEL: &str = "Prod";

/// What to do when two data rows of one table share a composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateKeyPolicy {
    /// Abort normalization of that input.
    #[default]
    Fail,
    /// Keep the first row, record a warning.
    KeepFirst,
    /// Keep the last row, record a warning.
    KeepLast,
}

/// Which header row carries which role.
///
/// Row indices are zero-based positions inside the header block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderLayout {
    /// Short field labels used verbatim for columns left of the boundary.
    pub label_row: usize,
    /// Category/description grouping labels.
    pub category_row: usize,
    /// Account-number grouping labels.
    pub account_row: usize,
    /// Debit/credit labels; `None` when the export has no such row.
    pub side_row: Option<usize>,
    pub fill_category: bool,
    pub fill_account: bool,
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self {
            label_row: 0,
            category_row: 0,
            account_row: 1,
            side_row: Some(2),
            fill_category: true,
            fill_account: true,
        }
    }
}

/// Per-variant normalization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub header_row_count: usize,
    /// Columns before this index are named by the label row; `None` treats every column that way.
    pub boundary_index: Option<usize>,
    pub identifier_label: String,
    pub asset_label: String,
    pub layout: HeaderLayout,
    pub duplicate_keys: DuplicateKeyPolicy,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            header_row_count: DEFAULT_HEADER_ROWS,
            boundary_index: None,
            identifier_label: DEFAULT_IDENTIFIER_LABEL.to_string(),
            asset_label: DEFAULT_ASSET_LABEL.to_string(),
            layout: HeaderLayout::default(),
            duplicate_keys: DuplicateKeyPolicy::default(),
        }
    }
}

impl NormalizeConfig {
    /// Layout with category, account and side rows on top of a trailing label row.
    pub fn hierarchical(header_row_count: usize, boundary_index: usize) -> Self {
        let label_row = header_row_count.saturating_sub(1);
        Self {
            header_row_count,
            boundary_index: Some(boundary_index),
            layout: HeaderLayout {
                label_row,
                category_row: 0,
                account_row: 1,
                side_row: (header_row_count > 3).then_some(2),
                fill_category: true,
                fill_account: true,
            },
            ..Self::default()
        }
    }

    pub fn with_labels(mut self, identifier: impl Into<String>, asset: impl Into<String>) -> Self {
        self.identifier_label = identifier.into();
        self.asset_label = asset.into();
        self
    }

    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.header_row_count > 0,
            "header_row_count must be at least 1"
        );
        anyhow::ensure!(
            self.layout.label_row < self.header_row_count,
            "label row {} lies outside the {}-row header block",
            self.layout.label_row,
            self.header_row_count
        );
        anyhow::ensure!(
            !self.identifier_label.trim().is_empty(),
            "identifier label must not be empty"
        );
        anyhow::ensure!(
            !self.asset_label.trim().is_empty(),
            "asset label must not be empty"
        );
        anyhow::ensure!(
            self.identifier_label != self.asset_label,
            "identifier and asset labels must differ"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

/// Locale text placed in the report: column header, sentinels and sheet names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLabels {
    pub differences: String,
    pub no_differences: String,
    pub only_in: String,
    pub empty_value: String,
    pub cleaned_sheet_prefix: String,
    pub comparison_sheet: String,
    pub key_column: String,
}

impl ReportLabels {
    pub fn english() -> Self {
        Self {
            differences: "differences".to_string(),
            no_differences: "no differences".to_string(),
            only_in: "only in".to_string(),
            empty_value: "(empty)".to_string(),
            cleaned_sheet_prefix: "Cleaned".to_string(),
            comparison_sheet: "Comparison".to_string(),
            key_column: "Key".to_string(),
        }
    }

    pub fn german() -> Self {
        Self {
            differences: "Unterschiede".to_string(),
            no_differences: "Keine".to_string(),
            only_in: "Nur in".to_string(),
            empty_value: "(leer)".to_string(),
            cleaned_sheet_prefix: "Bereinigt".to_string(),
            comparison_sheet: "Vergleich".to_string(),
            key_column: "Key".to_string(),
        }
    }

    pub fn for_language(language: Language) -> Self {
        match language {
            Language::En => Self::english(),
            Language::De => Self::german(),
        }
    }
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self::english()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Fully merged settings for one comparison run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub test_path: PathBuf,
    pub prod_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub test_label: String,
    pub prod_label: String,
    pub normalize: NormalizeConfig,
    pub language: Language,
    pub labels: ReportLabels,
    pub format: OutputFormat,
}

impl AppConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            test: cli_test,
            prod: cli_prod,
            output: cli_output,
            test_label: cli_test_label,
            prod_label: cli_prod_label,
            header_rows: cli_header_rows,
            boundary: cli_boundary,
            identifier_label: cli_identifier_label,
            asset_label: cli_asset_label,
            language: cli_language,
            duplicate_keys: cli_duplicate_keys,
            format: cli_format,
            print_schema: _,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            test: file_test,
            prod: file_prod,
            output: file_output,
            test_label: file_test_label,
            prod_label: file_prod_label,
            normalize: file_normalize,
            language: file_language,
            labels: file_labels,
            format: file_format,
        } = file_config;

        let test_path = cli_test
            .or(file_test)
            .context("no Test workbook given (use --test or the config file)")?;
        let prod_path = cli_prod
            .or(file_prod)
            .context("no Prod workbook given (use --prod or the config file)")?;

        let mut normalize = file_normalize.unwrap_or_default();
        if let Some(rows) = cli_header_rows {
            normalize.header_row_count = rows;
        }
        if let Some(boundary) = cli_boundary {
            if normalize.boundary_index.is_none() {
                normalize = NormalizeConfig {
                    identifier_label: normalize.identifier_label,
                    asset_label: normalize.asset_label,
                    duplicate_keys: normalize.duplicate_keys,
                    ..NormalizeConfig::hierarchical(normalize.header_row_count, boundary)
                };
            } else {
                normalize.boundary_index = Some(boundary);
            }
        }
        if let Some(label) = cli_identifier_label {
            normalize.identifier_label = label;
        }
        if let Some(label) = cli_asset_label {
            normalize.asset_label = label;
        }
        if let Some(policy) = cli_duplicate_keys {
            normalize.duplicate_keys = policy;
        }

        let language = cli_language.or(file_language).unwrap_or_default();
        let labels = file_labels.unwrap_or_else(|| ReportLabels::for_language(language));

        Ok(Self {
            test_path,
            prod_path,
            output_path: cli_output.or(file_output),
            test_label: cli_test_label
                .or(file_test_label)
                .unwrap_or_else(|| DEFAULT_TEST_LABEL.to_string()),
            prod_label: cli_prod_label
                .or(file_prod_label)
                .unwrap_or_else(|| DEFAULT_PROD_LABEL.to_string()),
            normalize,
            language,
            labels,
            format: cli_format.or(file_format).unwrap_or_default(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.normalize.validate()?;
        for path in [&self.test_path, &self.prod_path] {
            anyhow::ensure!(path.exists(), "workbook {:?} does not exist", path);
            anyhow::ensure!(path.is_file(), "workbook {:?} is not a file", path);
        }
        anyhow::ensure!(
            self.test_label != self.prod_label,
            "Test and Prod labels must differ"
        );
        Ok(())
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "sheet-reconcile",
    about = "Compare a Test and a Prod spreadsheet export row by row",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEET_RECONCILE_TEST",
        value_name = "FILE",
        help = "Workbook exported from the Test system"
    )]
    pub test: Option<PathBuf>,

    #[arg(
        long,
        env = "SHEET_RECONCILE_PROD",
        value_name = "FILE",
        help = "Workbook exported from the Prod system"
    )]
    pub prod: Option<PathBuf>,

    #[arg(
        long,
        short = 'o',
        env = "SHEET_RECONCILE_OUTPUT",
        value_name = "FILE",
        help = "Write cleaned inputs and the comparison to this .xlsx file"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "LABEL", help = "Display name of the first input")]
    pub test_label: Option<String>,

    #[arg(long, value_name = "LABEL", help = "Display name of the second input")]
    pub prod_label: Option<String>,

    #[arg(
        long,
        env = "SHEET_RECONCILE_HEADER_ROWS",
        value_name = "N",
        help = "Number of header rows before the data starts",
        value_parser = clap::value_parser!(usize)
    )]
    pub header_rows: Option<usize>,

    #[arg(
        long,
        env = "SHEET_RECONCILE_BOUNDARY",
        value_name = "INDEX",
        help = "First zero-based column whose name is composed from grouped header rows",
        value_parser = clap::value_parser!(usize)
    )]
    pub boundary: Option<usize>,

    #[arg(long, value_name = "LABEL", help = "Column label of the contract identifier")]
    pub identifier_label: Option<String>,

    #[arg(long, value_name = "LABEL", help = "Column label of the asset identifier")]
    pub asset_label: Option<String>,

    #[arg(
        long,
        env = "SHEET_RECONCILE_LANGUAGE",
        value_enum,
        value_name = "LANG",
        help = "Language of report labels"
    )]
    pub language: Option<Language>,

    #[arg(
        long,
        value_enum,
        value_name = "POLICY",
        help = "How to treat duplicate composite keys within one input"
    )]
    pub duplicate_keys: Option<DuplicateKeyPolicy>,

    #[arg(long, value_enum, value_name = "FORMAT", help = "Console output format")]
    pub format: Option<OutputFormat>,

    #[arg(long, help = "Print the JSON schema of the report and exit")]
    pub print_schema: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    test: Option<PathBuf>,
    prod: Option<PathBuf>,
    output: Option<PathBuf>,
    test_label: Option<String>,
    prod_label: Option<String>,
    normalize: Option<NormalizeConfig>,
    language: Option<Language>,
    labels: Option<ReportLabels>,
    format: Option<OutputFormat>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
