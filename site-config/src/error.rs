//! Error types for value resolution and the site config service

use std::path::PathBuf;
use thiserror::Error;

use site_config_fields::FieldsError;
use site_config_store::StoreError;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, SiteConfigError>;

/// Why an entity could not be loaded or rendered.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EntityError {
    /// No storage handles this entity type
    #[error("unknown entity type: {entity_type}")]
    UnknownEntityType { entity_type: String },

    /// The stored reference is not a usable id
    #[error("invalid {entity_type} id: {id}")]
    InvalidId { entity_type: String, id: String },

    /// No entity with this id
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: String },

    /// The entity exists but lacks data needed to represent it
    #[error("{entity_type} {id} is malformed: {reason}")]
    Malformed {
        entity_type: String,
        id: String,
        reason: String,
    },

    /// The storage backend failed
    #[error("entity storage error: {0}")]
    Storage(String),
}

/// Errors surfaced by the site config service
#[derive(Debug, Error)]
pub enum SiteConfigError {
    /// Schema registry failed to load
    #[error(transparent)]
    Fields(#[from] FieldsError),

    /// A backing store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors loading runtime settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Explicit settings file does not exist
    #[error("settings file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Settings could not be parsed or extracted
    #[error("failed to parse settings: {0}")]
    Parse(#[from] Box<figment::Error>),

    /// Unsupported settings file extension
    #[error("unsupported settings file format: {path}")]
    UnsupportedFormat { path: PathBuf },
}

impl From<figment::Error> for SettingsError {
    fn from(error: figment::Error) -> Self {
        SettingsError::Parse(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_error_display() {
        let err = EntityError::NotFound {
            entity_type: "node".into(),
            id: "42".into(),
        };
        assert_eq!(err.to_string(), "node 42 not found");
    }

    #[test]
    fn store_error_is_transparent() {
        let err: SiteConfigError = StoreError::LockPoisoned.into();
        assert_eq!(err.to_string(), "store lock poisoned");
    }
}
