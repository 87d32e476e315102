//! Uniform read/write over the two backing stores.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use site_config_fields::{SiteConfigDef, Storage};

use crate::config::{ConfigStore, ConfigStoreExt};
use crate::error::Result;
use crate::state::StateStore;

/// Namespace prefixed to every storage key.
pub const DEFAULT_NAMESPACE: &str = "site_config";

/// Where an entry's values live: `<namespace>.<entry-id>[.<langcode>]`.
///
/// The language suffix is present only for translatable entries. Keys are
/// derived on every access and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(namespace: &str, def: &SiteConfigDef, langcode: &str) -> Self {
        if def.translatable {
            Self(format!("{namespace}.{}.{langcode}", def.id))
        } else {
            Self(format!("{namespace}.{}", def.id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Flat state key for one field.
    fn field_key(&self, field: &str) -> String {
        format!("{}.{field}", self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads and writes field values, choosing the backend from the entry's [`Storage`].
#[derive(Clone)]
pub struct ValueStore {
    namespace: String,
    state: Arc<dyn StateStore>,
    config: Arc<dyn ConfigStore>,
}

impl fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ValueStore {
    pub fn new(state: Arc<dyn StateStore>, config: Arc<dyn ConfigStore>) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            state,
            config,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Storage key for `def` in language `langcode`.
    pub fn storage_key(&self, def: &SiteConfigDef, langcode: &str) -> StorageKey {
        StorageKey::new(&self.namespace, def, langcode)
    }

    /// Raw stored value of `field`; `Null` when nothing is stored.
    pub fn read(&self, storage: Storage, key: &StorageKey, field: &str) -> Result<Value> {
        let value = match storage {
            Storage::State => self.state.get(&key.field_key(field))?,
            Storage::Config => self.config.get(key.as_str())?.get(field).cloned(),
        };
        Ok(value.unwrap_or(Value::Null))
    }

    /// Store `value` as the raw value of `field`.
    pub fn write(
        &self,
        storage: Storage,
        key: &StorageKey,
        field: &str,
        value: Value,
    ) -> Result<()> {
        match storage {
            Storage::State => self.state.set(&key.field_key(field), value),
            Storage::Config => self
                .config
                .get_editable(key.as_str())?
                .set(field, value)
                .save(),
        }
    }
}
