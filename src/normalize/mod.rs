pub mod header;

use crate::config::{DuplicateKeyPolicy, NormalizeConfig};
use crate::error::{KeyCollisionWarning, ReconcileError, ReconcileResult, SchemaRule};
use crate::model::{CellValue, ColumnName, RawSheet};
use crate::workbook;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Joins the identifier and asset parts of a [`CompositeKey`].
pub const KEY_SEPARATOR: &str = "_";

/// Row identity shared by both inputs: `identifier_asset`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct CompositeKey(String);

impl CompositeKey {
    pub fn new(identifier: &str, asset: &str) -> Self {
        Self(format!("{identifier}{KEY_SEPARATOR}{asset}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// String form of an identifier cell; numbers carry no locale formatting.
pub fn key_part(value: Option<&CellValue>) -> String {
    value.map(CellValue::render).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub key: CompositeKey,
    pub identifier: String,
    pub asset: String,
    /// 1-based row number in the source sheet, 0 for rows built in memory.
    pub sheet_row: usize,
    pub values: IndexMap<ColumnName, Option<CellValue>>,
}

impl NormalizedRow {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column).and_then(Option::as_ref)
    }
}

/// A keyed table with a single-row header. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    source: String,
    identifier_column: ColumnName,
    asset_column: ColumnName,
    columns: Vec<ColumnName>,
    rows: Vec<NormalizedRow>,
    index: BTreeMap<CompositeKey, usize>,
    warnings: Vec<KeyCollisionWarning>,
}

impl NormalizedTable {
    /// Label of the input this table came from, e.g. "Test".
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn identifier_column(&self) -> &str {
        &self.identifier_column
    }

    pub fn asset_column(&self) -> &str {
        &self.asset_column
    }

    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Rows in sheet order.
    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keys in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &CompositeKey> {
        self.index.keys()
    }

    pub fn get(&self, key: &CompositeKey) -> Option<&NormalizedRow> {
        self.index.get(key).map(|&idx| &self.rows[idx])
    }

    pub fn contains_key(&self, key: &CompositeKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn warnings(&self) -> &[KeyCollisionWarning] {
        &self.warnings
    }
}

/// Assembles a [`NormalizedTable`] row by row, enforcing key uniqueness.
#[derive(Debug)]
pub struct TableBuilder {
    table: NormalizedTable,
    policy: DuplicateKeyPolicy,
}

impl TableBuilder {
    pub fn new(
        source: impl Into<String>,
        identifier_column: impl Into<ColumnName>,
        asset_column: impl Into<ColumnName>,
        columns: Vec<ColumnName>,
    ) -> ReconcileResult<Self> {
        let source = source.into();
        let identifier_column = identifier_column.into();
        let asset_column = asset_column.into();
        for label in [&identifier_column, &asset_column] {
            if !columns.contains(label) {
                return Err(ReconcileError::schema(
                    source,
                    SchemaRule::MissingColumn {
                        label: label.clone(),
                    },
                ));
            }
        }
        Ok(Self {
            table: NormalizedTable {
                source,
                identifier_column,
                asset_column,
                columns,
                rows: Vec::new(),
                index: BTreeMap::new(),
                warnings: Vec::new(),
            },
            policy: DuplicateKeyPolicy::default(),
        })
    }

    pub fn duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Adds a row given as `(column, value)` pairs. Schema columns without a
    /// value are null; unknown columns extend the schema.
    pub fn push<I, S>(&mut self, sheet_row: usize, cells: I) -> ReconcileResult<&mut Self>
    where
        I: IntoIterator<Item = (S, Option<CellValue>)>,
        S: Into<ColumnName>,
    {
        let mut values: IndexMap<ColumnName, Option<CellValue>> = self
            .table
            .columns
            .iter()
            .map(|column| (column.clone(), None))
            .collect();
        for (column, value) in cells {
            let column = column.into();
            if !values.contains_key(&column) {
                self.table.columns.push(column.clone());
                for row in &mut self.table.rows {
                    row.values.insert(column.clone(), None);
                }
            }
            values.insert(column, value);
        }

        let identifier = key_part(
            values
                .get(&self.table.identifier_column)
                .and_then(Option::as_ref),
        );
        let asset = key_part(values.get(&self.table.asset_column).and_then(Option::as_ref));
        let key = CompositeKey::new(&identifier, &asset);
        let row = NormalizedRow {
            key: key.clone(),
            identifier,
            asset,
            sheet_row,
            values,
        };

        match self.table.index.get(&key).copied() {
            None => {
                self.table.index.insert(key, self.table.rows.len());
                self.table.rows.push(row);
            }
            Some(existing) => {
                let warning = KeyCollisionWarning {
                    input: self.table.source.clone(),
                    key: key.to_string(),
                    first_row: self.table.rows[existing].sheet_row,
                    duplicate_row: sheet_row,
                };
                match self.policy {
                    DuplicateKeyPolicy::Fail => {
                        return Err(ReconcileError::KeyCollision(warning));
                    }
                    DuplicateKeyPolicy::KeepFirst => {}
                    DuplicateKeyPolicy::KeepLast => {
                        self.table.rows[existing] = row;
                    }
                }
                tracing::warn!(
                    input = %warning.input,
                    key = %warning.key,
                    first_row = warning.first_row,
                    duplicate_row = warning.duplicate_row,
                    policy = ?self.policy,
                    "duplicate composite key"
                );
                self.table.warnings.push(warning);
            }
        }
        Ok(self)
    }

    pub fn build(self) -> NormalizedTable {
        self.table
    }
}

/// Reads the first worksheet of `bytes` and normalizes it.
pub fn normalize(
    bytes: &[u8],
    config: &NormalizeConfig,
    source: &str,
) -> ReconcileResult<NormalizedTable> {
    let sheet = workbook::read_first_sheet(bytes, source)?;
    normalize_sheet(&sheet, config, source)
}

/// Normalizes an already materialized sheet.
pub fn normalize_sheet(
    sheet: &RawSheet,
    config: &NormalizeConfig,
    source: &str,
) -> ReconcileResult<NormalizedTable> {
    let _span = tracing::info_span!("normalize", input = source, sheet = sheet.name()).entered();

    if sheet.row_count() < config.header_row_count {
        return Err(ReconcileError::schema(
            source,
            SchemaRule::HeaderBlockTooShort {
                required: config.header_row_count,
                available: sheet.row_count(),
            },
        ));
    }

    let (header_block, data_rows) = sheet.split_header(config.header_row_count);
    let columns = header::resolve_column_names(
        header_block,
        sheet.column_count(),
        config.boundary_index,
        &config.layout,
    )
    .map_err(|rule| ReconcileError::schema(source, rule))?;
    tracing::debug!(columns = columns.len(), "header resolved");

    let mut builder = TableBuilder::new(
        source,
        config.identifier_label.as_str(),
        config.asset_label.as_str(),
        columns.clone(),
    )?
    .duplicate_keys(config.duplicate_keys);

    let mut skipped = 0usize;
    for (offset, row) in data_rows.iter().enumerate() {
        if row.iter().all(Option::is_none) {
            skipped += 1;
            continue;
        }
        let sheet_row = config.header_row_count + offset + 1;
        builder.push(sheet_row, columns.iter().cloned().zip(row.iter().cloned()))?;
    }

    let table = builder.build();
    if skipped > 0 {
        tracing::debug!(skipped, "skipped empty data rows");
    }
    if table.is_empty() {
        tracing::warn!(input = source, "no data rows below the header block");
    }
    tracing::info!(
        input = source,
        rows = table.len(),
        columns = table.columns().len(),
        collisions = table.warnings().len(),
        "table normalized"
    );
    Ok(table)
}
