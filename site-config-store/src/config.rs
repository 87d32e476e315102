//! Structured configuration store backing `storage: config` entries.
//!
//! Each entry is one named config object (e.g. `site_config.footer`) holding
//! all of its fields. Objects are read as immutable snapshots and written back
//! whole through an [`EditableConfig`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::{Map, Value};

use crate::atomic_write;
use crate::error::{Result, StoreError};

/// A named config object. Missing objects read as empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigObject {
    name: String,
    data: Map<String, Value>,
}

impl ConfigObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(name: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn is_new(&self) -> bool {
        self.data.is_empty()
    }
}

/// Versioned structured configuration, addressed by object name.
pub trait ConfigStore: Send + Sync {
    /// Snapshot of the object named `name`.
    fn get(&self, name: &str) -> Result<ConfigObject>;

    /// Replace the stored object with `object`.
    fn save(&self, object: &ConfigObject) -> Result<()>;
}

/// Editing access for any [`ConfigStore`], including trait objects.
pub trait ConfigStoreExt: ConfigStore {
    /// Load `name` for editing.
    fn get_editable(&self, name: &str) -> Result<EditableConfig<'_, Self>>;
}

impl<T: ConfigStore + ?Sized> ConfigStoreExt for T {
    fn get_editable(&self, name: &str) -> Result<EditableConfig<'_, Self>> {
        Ok(EditableConfig {
            store: self,
            object: self.get(name)?,
        })
    }
}

/// A config object checked out for editing. Nothing is stored until [`save`](Self::save).
pub struct EditableConfig<'a, S: ConfigStore + ?Sized> {
    store: &'a S,
    object: ConfigObject,
}

impl<S: ConfigStore + ?Sized> EditableConfig<'_, S> {
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.object.data.insert(field.into(), value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.object.get(field)
    }

    pub fn save(self) -> Result<()> {
        self.store.save(&self.object)
    }
}

/// Config objects kept in process memory only.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    objects: RwLock<HashMap<String, Map<String, Value>>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, name: &str) -> Result<ConfigObject> {
        let data = self.objects.read()?.get(name).cloned().unwrap_or_default();
        Ok(ConfigObject::with_data(name, data))
    }

    fn save(&self, object: &ConfigObject) -> Result<()> {
        self.objects
            .write()?
            .insert(object.name.clone(), object.data.clone());
        Ok(())
    }
}

/// One YAML file per config object under a directory. Reads go to disk every
/// time so edits made outside the process are picked up.
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    root: PathBuf,
}

impl YamlConfigStore {
    /// Use `root` as the config directory, creating it if missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.yml"))
    }
}

impl ConfigStore for YamlConfigStore {
    fn get(&self, name: &str) -> Result<ConfigObject> {
        let path = self.object_path(name);
        if !path.exists() {
            return Ok(ConfigObject::new(name));
        }
        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(ConfigObject::new(name));
        }
        match serde_yaml::from_str::<Value>(&content)? {
            Value::Object(data) => Ok(ConfigObject::with_data(name, data)),
            Value::Null => Ok(ConfigObject::new(name)),
            _ => Err(StoreError::NotAMapping {
                name: name.to_string(),
            }),
        }
    }

    fn save(&self, object: &ConfigObject) -> Result<()> {
        let yaml = serde_yaml::to_string(&object.data)?;
        atomic_write(&self.object_path(&object.name), yaml.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn missing_object_is_new_and_empty() {
        let store = MemoryConfigStore::new();
        let object = store.get("site_config.footer").unwrap();
        assert!(object.is_new());
        assert_eq!(object.name(), "site_config.footer");
        assert_eq!(object.get("copyright"), None);
    }

    #[test]
    fn editable_set_is_not_visible_until_saved() {
        let store = MemoryConfigStore::new();
        let editable = store
            .get_editable("site_config.footer")
            .unwrap()
            .set("copyright", json!("© 2024"));
        assert_eq!(editable.get("copyright"), Some(&json!("© 2024")));
        assert!(store.get("site_config.footer").unwrap().is_new());

        editable.save().unwrap();
        assert_eq!(
            store.get("site_config.footer").unwrap().get("copyright"),
            Some(&json!("© 2024"))
        );
    }

    #[test]
    fn editing_one_field_keeps_the_others() {
        let store = MemoryConfigStore::new();
        store
            .get_editable("c")
            .unwrap()
            .set("a", json!(1))
            .set("b", json!(2))
            .save()
            .unwrap();
        store.get_editable("c").unwrap().set("a", json!(10)).save().unwrap();

        let object = store.get("c").unwrap();
        assert_eq!(object.get("a"), Some(&json!(10)));
        assert_eq!(object.get("b"), Some(&json!(2)));
    }

    #[test]
    fn yaml_store_round_trips_through_disk() {
        let tmp = TempDir::new().unwrap();
        let store = YamlConfigStore::open(tmp.path().join("config")).unwrap();
        store
            .get_editable("site_config.footer")
            .unwrap()
            .set("links", json!([{"title": "Home", "target": "7"}]))
            .save()
            .unwrap();

        assert!(tmp.path().join("config/site_config.footer.yml").exists());

        let reopened = YamlConfigStore::open(tmp.path().join("config")).unwrap();
        assert_eq!(
            reopened.get("site_config.footer").unwrap().get("links"),
            Some(&json!([{"title": "Home", "target": "7"}]))
        );
    }

    #[test]
    fn yaml_store_rejects_scalar_object() {
        let tmp = TempDir::new().unwrap();
        let store = YamlConfigStore::open(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("broken.yml"), "just a string\n").unwrap();
        assert!(matches!(
            store.get("broken"),
            Err(StoreError::NotAMapping { .. })
        ));
    }
}
