//! Error types for the schema registry

use std::path::PathBuf;
use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur while loading or editing site config schemas
#[derive(Debug, Error)]
pub enum FieldsError {
    /// Two definition files declare the same entry id
    #[error("duplicate site config entry id: {id}")]
    DuplicateDefinition { id: String },

    /// A multivalue field declared another multivalue field as a sub-field
    #[error("multivalue sub-field '{sub_field}' cannot itself be multivalue")]
    NestedMultivalue { sub_field: String },

    /// Definitions directory not found
    #[error("definitions directory not found: {path}")]
    NotInitialized { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
