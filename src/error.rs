//! Error types for normalization, reconciliation and export.
//!
//! Normalization failures name the input they came from and the rule that
//! failed, so a caller can turn them into a user-facing message without
//! inspecting strings. Duplicate composite keys are modelled separately as
//! [`KeyCollisionWarning`], which is fatal or advisory depending on the
//! configured duplicate-key policy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for library operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable codes for the error kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// Header block malformed, required column missing, boundary out of range
    SchemaError = 1001,
    /// Workbook unreadable or without a worksheet
    InputError = 1002,
    /// Duplicate composite key within one table
    KeyCollision = 1003,
    /// Report workbook could not be produced
    ExportError = 1004,
}

impl ErrorCode {
    /// Get the integer code
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::SchemaError => "schema_error",
            ErrorCode::InputError => "input_error",
            ErrorCode::KeyCollision => "data_quality",
            ErrorCode::ExportError => "export_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

// =============================================================================
// SCHEMA RULES
// =============================================================================

/// The normalization rule that rejected an input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaRule {
    #[error("header block needs {required} rows but the sheet has only {available}")]
    HeaderBlockTooShort { required: usize, available: usize },

    #[error("{role} row {row} lies outside the {header_rows}-row header block")]
    HeaderRowOutsideBlock {
        role: &'static str,
        row: usize,
        header_rows: usize,
    },

    #[error("boundary index {boundary} exceeds the sheet's {columns} columns")]
    BoundaryOutOfRange { boundary: usize, columns: usize },

    #[error("required column '{label}' not found in resolved header")]
    MissingColumn { label: String },

    #[error("column name '{name}' resolved for both column {first} and column {second}")]
    DuplicateColumn {
        name: String,
        first: String,
        second: String,
    },
}

// =============================================================================
// KEY COLLISIONS
// =============================================================================

/// Two data rows of one table produced the same composite key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KeyCollisionWarning {
    /// Which input the collision was found in
    pub input: String,
    /// The repeated composite key
    pub key: String,
    /// 1-based sheet row of the first occurrence
    pub first_row: usize,
    /// 1-based sheet row of the repeated occurrence
    pub duplicate_row: usize,
}

impl fmt::Display for KeyCollisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: key '{}' appears in row {} and again in row {}",
            self.input, self.key, self.first_row, self.duplicate_row
        )
    }
}

// =============================================================================
// RECONCILE ERROR
// =============================================================================

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{input}: {rule}")]
    Schema { input: String, rule: SchemaRule },

    #[error("{input}: unable to read workbook: {reason}")]
    Input { input: String, reason: String },

    #[error("duplicate composite key: {0}")]
    KeyCollision(KeyCollisionWarning),

    #[error("failed to write report workbook: {reason}")]
    Export { reason: String },
}

impl ReconcileError {
    pub fn schema(input: impl Into<String>, rule: SchemaRule) -> Self {
        ReconcileError::Schema {
            input: input.into(),
            rule,
        }
    }

    pub fn input(input: impl Into<String>, reason: impl fmt::Display) -> Self {
        ReconcileError::Input {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ReconcileError::Schema { .. } => ErrorCode::SchemaError,
            ReconcileError::Input { .. } => ErrorCode::InputError,
            ReconcileError::KeyCollision(_) => ErrorCode::KeyCollision,
            ReconcileError::Export { .. } => ErrorCode::ExportError,
        }
    }

    /// The input label the error is attributed to, if any
    pub fn input_label(&self) -> Option<&str> {
        match self {
            ReconcileError::Schema { input, .. } | ReconcileError::Input { input, .. } => {
                Some(input)
            }
            ReconcileError::KeyCollision(warning) => Some(&warning.input),
            ReconcileError::Export { .. } => None,
        }
    }
}
