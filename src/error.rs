//! Custom error types for revtrail
//!
//! This module defines the error hierarchy for the audit engine using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

use crate::storage::StoreError;

/// The main error type for audit trail operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Malformed record rejected before anything is written
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store unavailable, constraint violation, or a lost version race
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A single field could not be rendered
    #[error("Render error on '{field}': {message}")]
    Render { field: String, message: String },

    /// The store read behind a reconstruction failed
    #[error("Reconstruction error: {0}")]
    Reconstruction(String),

    /// Entity or record not found
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),
}

impl AuditError {
    /// Create a "not found" error for an arbitrary entity type
    pub fn not_found(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    /// Create a render error for one field
    pub fn render(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            field: field.into(),
            message: message.into(),
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

    /// Check if this is a persistence error
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<StoreError> for AuditError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Result type alias for audit trail operations
pub type AuditResult<T> = Result<T, AuditError>;
