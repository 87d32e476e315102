//! Error types for the backing stores

use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by a backing store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A stored config object is not a mapping
    #[error("config object '{name}' is not a mapping")]
    NotAMapping { name: String },

    /// The state file is not a mapping of keys to values
    #[error("state file {path} is not a mapping")]
    InvalidStateFile { path: PathBuf },

    /// A lock guarding in-memory data was poisoned by a panicking writer
    #[error("store lock poisoned")]
    LockPoisoned,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::LockPoisoned
    }
}
