//! Referenced entities and the storage they are loaded from.
//!
//! Site config values only hold entity ids. An [`EntityStorage`] turns an id
//! into an [`Entity`] snapshot carrying what the read APIs and the settings
//! form need: type, bundle, stable uuid, internal id, location and
//! translations.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{EntityError, SiteConfigError};
use site_config_fields::FILE_ENTITY_TYPE;

/// Language code of entities that are not language-specific.
pub const LANGCODE_NOT_SPECIFIED: &str = "und";

/// Per-language overrides of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A loaded entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: String,
    pub bundle: String,
    pub uuid: String,
    /// Internal id, numeric for most content.
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_langcode")]
    pub langcode: String,
    /// Canonical page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Stored file location, for file entities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_uri: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub translations: BTreeMap<String, Translation>,
}

fn default_langcode() -> String {
    LANGCODE_NOT_SPECIFIED.to_string()
}

impl Entity {
    pub fn new(
        entity_type: impl Into<String>,
        bundle: impl Into<String>,
        uuid: impl Into<String>,
        id: impl Into<Value>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            uuid: uuid.into(),
            id: id.into(),
            label: None,
            langcode: LANGCODE_NOT_SPECIFIED.to_string(),
            url: None,
            file_uri: None,
            translations: BTreeMap::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_file_uri(mut self, uri: impl Into<String>) -> Self {
        self.file_uri = Some(uri.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_langcode(mut self, langcode: impl Into<String>) -> Self {
        self.langcode = langcode.into();
        self
    }

    pub fn with_translation(
        mut self,
        langcode: impl Into<String>,
        translation: Translation,
    ) -> Self {
        self.translations.insert(langcode.into(), translation);
        self
    }

    /// `<entity type>--<bundle>`, the resource type name used by the read APIs.
    pub fn type_name(&self) -> String {
        format!("{}--{}", self.entity_type, self.bundle)
    }

    /// Internal id as a string key.
    pub fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.entity_type == FILE_ENTITY_TYPE
    }

    pub fn has_translation(&self, langcode: &str) -> bool {
        self.langcode == langcode || self.translations.contains_key(langcode)
    }

    /// The entity as seen in `langcode`, if a translation exists.
    pub fn get_translation(&self, langcode: &str) -> Option<Entity> {
        if self.langcode == langcode {
            return Some(self.clone());
        }
        let translation = self.translations.get(langcode)?;
        let mut translated = self.clone();
        translated.langcode = langcode.to_string();
        if let Some(label) = &translation.label {
            translated.label = Some(label.clone());
        }
        if let Some(url) = &translation.url {
            translated.url = Some(url.clone());
        }
        Some(translated)
    }

    /// Where the entity can be fetched: the raw file location for files, the
    /// page URL for everything else.
    pub fn to_url(&self) -> Result<String, EntityError> {
        let (location, what) = if self.is_file() {
            (&self.file_uri, "file uri")
        } else {
            (&self.url, "url")
        };
        location.clone().ok_or_else(|| EntityError::Malformed {
            entity_type: self.entity_type.clone(),
            id: self.id_string(),
            reason: format!("no {what}"),
        })
    }
}

/// Loads entities by type and id.
pub trait EntityStorage: Send + Sync {
    /// Load `entity_type` `id`. Unknown types and storage failures are errors;
    /// a missing entity is `Ok(None)`.
    fn load(&self, entity_type: &str, id: &str) -> Result<Option<Entity>, EntityError>;
}

/// Entities held in memory, grouped by type.
#[derive(Debug, Default)]
pub struct MemoryEntityStorage {
    entities: RwLock<HashMap<String, HashMap<String, Entity>>>,
}

impl MemoryEntityStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `entity_type` loadable even before any entity of it exists.
    pub fn register_type(&self, entity_type: &str) {
        self.write_lock()
            .entry(entity_type.to_string())
            .or_default();
    }

    pub fn insert(&self, entity: Entity) {
        self.write_lock()
            .entry(entity.entity_type.clone())
            .or_default()
            .insert(entity.id_string(), entity);
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, HashMap<String, HashMap<String, Entity>>> {
        self.entities.write().unwrap_or_else(|poisoned| {
            warn!("entity storage lock poisoned, recovering");
            self.entities.clear_poison();
            PoisonError::into_inner(poisoned)
        })
    }

    pub fn with_entity(self, entity: Entity) -> Self {
        self.insert(entity);
        self
    }

    /// Load `<root>/<entity type>/*.yaml`, one entity per file. Unreadable or
    /// malformed files are logged and skipped.
    pub async fn load_dir(root: &Path) -> Result<Self, SiteConfigError> {
        let storage = Self::new();
        if !root.is_dir() {
            debug!(?root, "no entity directory, starting empty");
            return Ok(storage);
        }

        let mut types = fs::read_dir(root).await?;
        while let Some(type_dir) = types.next_entry().await? {
            if !type_dir.file_type().await?.is_dir() {
                continue;
            }
            let entity_type = type_dir.file_name().to_string_lossy().into_owned();
            storage.register_type(&entity_type);

            let mut files = fs::read_dir(type_dir.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                    continue;
                }
                let entity = match fs::read(&path).await {
                    Ok(content) => serde_yaml::from_slice::<Entity>(&content)
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                let entity = match entity {
                    Ok(entity) => entity,
                    Err(e) => {
                        warn!(?path, error = %e, "skipping invalid entity");
                        continue;
                    }
                };
                if entity.entity_type != entity_type {
                    warn!(
                        ?path,
                        declared = %entity.entity_type,
                        "entity stored under another type directory"
                    );
                }
                storage.insert(entity);
            }
        }

        Ok(storage)
    }
}

impl EntityStorage for MemoryEntityStorage {
    fn load(&self, entity_type: &str, id: &str) -> Result<Option<Entity>, EntityError> {
        let entities = self
            .entities
            .read()
            .map_err(|e| EntityError::Storage(e.to_string()))?;
        let of_type = entities
            .get(entity_type)
            .ok_or_else(|| EntityError::UnknownEntityType {
                entity_type: entity_type.to_string(),
            })?;
        Ok(of_type.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn page() -> Entity {
        Entity::new("node", "page", "abc", 42)
            .with_label("About")
            .with_langcode("en")
            .with_url("/about")
            .with_translation(
                "fr",
                Translation {
                    label: Some("À propos".into()),
                    url: Some("/fr/a-propos".into()),
                },
            )
    }

    #[test]
    fn type_name_joins_type_and_bundle() {
        assert_eq!(page().type_name(), "node--page");
    }

    #[test]
    fn translation_overrides_label_and_url() {
        let fr = page().get_translation("fr").unwrap();
        assert_eq!(fr.langcode, "fr");
        assert_eq!(fr.label.as_deref(), Some("À propos"));
        assert_eq!(fr.to_url().unwrap(), "/fr/a-propos");
        assert_eq!(fr.uuid, "abc");
    }

    #[test]
    fn missing_translation() {
        assert!(!page().has_translation("de"));
        assert!(page().get_translation("de").is_none());
        assert!(page().has_translation("en"));
    }

    #[test]
    fn file_location_is_the_file_uri() {
        let file = Entity::new("file", "file", "f-1", 3)
            .with_url("/file/3")
            .with_file_uri("public://logo.png");
        assert_eq!(file.to_url().unwrap(), "public://logo.png");
    }

    #[test]
    fn entity_without_location_is_malformed() {
        let err = Entity::new("node", "page", "x", 1).to_url().unwrap_err();
        assert!(matches!(err, EntityError::Malformed { .. }));
    }

    #[test]
    fn memory_storage_load() {
        let storage = MemoryEntityStorage::new().with_entity(page());
        assert_eq!(storage.load("node", "42").unwrap(), Some(page()));
        assert_eq!(storage.load("node", "43").unwrap(), None);
        assert!(matches!(
            storage.load("media", "42"),
            Err(EntityError::UnknownEntityType { .. })
        ));
    }

    #[test]
    fn string_ids_are_kept_verbatim() {
        let term = Entity::new("taxonomy_term", "tags", "t", json!("rust"));
        assert_eq!(term.id_string(), "rust");
    }

    #[tokio::test]
    async fn load_dir_reads_entities_per_type() {
        let tmp = TempDir::new().unwrap();
        let node_dir = tmp.path().join("node");
        std::fs::create_dir_all(&node_dir).unwrap();
        std::fs::create_dir_all(tmp.path().join("file")).unwrap();
        std::fs::write(
            node_dir.join("42.yaml"),
            serde_yaml::to_string(&page()).unwrap(),
        )
        .unwrap();

        let storage = MemoryEntityStorage::load_dir(tmp.path()).await.unwrap();
        assert_eq!(storage.load("node", "42").unwrap(), Some(page()));
        assert_eq!(storage.load("file", "1").unwrap(), None);
    }

    #[tokio::test]
    #[traced_test]
    async fn load_dir_skips_malformed_entities() {
        let tmp = TempDir::new().unwrap();
        let node_dir = tmp.path().join("node");
        std::fs::create_dir_all(&node_dir).unwrap();
        std::fs::write(
            node_dir.join("42.yaml"),
            serde_yaml::to_string(&page()).unwrap(),
        )
        .unwrap();
        std::fs::write(node_dir.join("43.yaml"), "bundle: [oops").unwrap();
        std::fs::write(node_dir.join("44.yaml"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let storage = MemoryEntityStorage::load_dir(tmp.path()).await.unwrap();
        assert_eq!(storage.load("node", "42").unwrap(), Some(page()));
        assert_eq!(storage.load("node", "43").unwrap(), None);
        assert!(logs_contain("skipping invalid entity"));
    }

    #[test]
    #[traced_test]
    fn insert_recovers_from_poisoned_lock() {
        let storage = std::sync::Arc::new(MemoryEntityStorage::new());
        let poisoner = storage.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entities.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(storage.entities.is_poisoned());

        storage.insert(page());
        assert_eq!(storage.load("node", "42").unwrap(), Some(page()));
        assert!(logs_contain("entity storage lock poisoned"));
    }

    #[tokio::test]
    async fn load_dir_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let storage = MemoryEntityStorage::load_dir(&tmp.path().join("none"))
            .await
            .unwrap();
        assert!(storage.load("node", "1").is_err());
    }
}
