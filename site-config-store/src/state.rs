//! Key/value state store backing `storage: status` entries.
//!
//! Every field is its own key, e.g. `site_config.footer.copyright`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

use crate::atomic_write;
use crate::error::{Result, StoreError};

/// Mutable runtime state, addressed by flat keys.
pub trait StateStore: Send + Sync {
    /// The value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing what was there.
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// State kept in process memory only.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.write()?.insert(key.to_string(), value);
        Ok(())
    }
}

/// State persisted as a single YAML mapping, rewritten on every `set`.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
}

impl FileStateStore {
    /// Open the state file at `path`. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_yaml::from_str(&content)
                    .map_err(|_| StoreError::InvalidStateFile { path: path.clone() })?
            }
        } else {
            BTreeMap::new()
        };
        debug!(?path, keys = values.len(), "state file opened");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.write()?;
        let mut next = values.clone();
        next.insert(key.to_string(), value);
        let yaml = serde_yaml::to_string(&next)?;
        atomic_write(&self.path, yaml.as_bytes())?;
        *values = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn memory_store_get_missing_is_none() {
        let store = MemoryStateStore::new();
        assert_eq!(store.get("site_config.footer.copyright").unwrap(), None);
    }

    #[test]
    fn memory_store_last_write_wins() {
        let store = MemoryStateStore::new();
        store.set("k", json!("one")).unwrap();
        store.set("k", json!("two")).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!("two")));
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.yaml");
        {
            let store = FileStateStore::open(&path).unwrap();
            store.set("site_config.social.links", json!([{"url": "https://x"}])).unwrap();
        }
        let store = FileStateStore::open(&path).unwrap();
        assert_eq!(
            store.get("site_config.social.links").unwrap(),
            Some(json!([{"url": "https://x"}]))
        );
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = FileStateStore::open(blocker.join("state.yaml")).unwrap();

        assert!(store.set("k", json!("v")).is_err());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_non_mapping() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.yaml");
        std::fs::write(&path, "- just\n- a list\n").unwrap();
        assert!(matches!(
            FileStateStore::open(&path),
            Err(StoreError::InvalidStateFile { .. })
        ));
    }
}
