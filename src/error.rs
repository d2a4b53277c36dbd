//! Custom error types for the academy toolkit
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. Row-level variants are recovered by the
//! import orchestrator; parse and store-read failures are terminal.

use thiserror::Error;

/// The main error type for academy operations
#[derive(Error, Debug)]
pub enum AcademyError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// A single row failed validation (missing required field, bad value)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// A relation field points at a record that does not exist
    #[error("Invalid reference in '{field}': {target} '{identifier}' does not exist")]
    Reference {
        field: String,
        target: &'static str,
        identifier: String,
    },

    /// The bundle container could not be opened or parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Entity store read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Billing reconciliation errors
    #[error("Billing error: {0}")]
    Billing(String),
}

impl AcademyError {
    /// Create a "not found" error for any entity type
    pub fn not_found(entity_type: &'static str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            identifier: identifier.into(),
        }
    }

    /// Create an invalid-reference error
    pub fn reference(
        field: impl Into<String>,
        target: &'static str,
        identifier: impl Into<String>,
    ) -> Self {
        Self::Reference {
            field: field.into(),
            target,
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the error only concerns one row and should be counted, not raised
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Reference { .. } | Self::NotFound { .. } | Self::Storage(_)
        )
    }
}

impl From<std::io::Error> for AcademyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AcademyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<csv::Error> for AcademyError {
    fn from(err: csv::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<zip::result::ZipError> for AcademyError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for academy operations
pub type AcademyResult<T> = Result<T, AcademyError>;
