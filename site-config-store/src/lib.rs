//! Backing stores for site configuration values
//!
//! Two stores hold raw field values:
//!
//! - [`StateStore`] — mutable runtime state, one flat key per field
//! - [`ConfigStore`] — structured config objects, one object per entry
//!
//! [`ValueStore`] sits in front of both and picks one per entry from its
//! declared [`Storage`](site_config_fields::Storage). Stores are synchronous;
//! concurrent writers to the same key get whatever last-write-wins behaviour
//! the backend has.

pub mod adapter;
pub mod config;
pub mod error;
pub mod state;

pub use adapter::{StorageKey, ValueStore, DEFAULT_NAMESPACE};
pub use config::{
    ConfigObject, ConfigStore, ConfigStoreExt, EditableConfig, MemoryConfigStore, YamlConfigStore,
};
pub use error::{Result, StoreError};
pub use state::{FileStateStore, MemoryStateStore, StateStore};

use std::path::Path;

use ulid::Ulid;

/// Write to a temp file then rename for atomic persistence.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"))?;
    std::fs::create_dir_all(dir)?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
