//! SiteConfigRegistry — the set of known site config entries.
//!
//! Entries are YAML files under a definitions directory, one per entry.
//! Loading happens once; request handling only reads the registry.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::fs;
use tracing::{debug, error, warn};
use ulid::Ulid;

use crate::error::{FieldsError, Result};
use crate::types::SiteConfigDef;

/// Computes select options for an entry whose fields declare none statically.
pub trait OptionsProvider: Send + Sync {
    /// Options for `field_name`, value → label.
    fn options(&self, field_name: &str) -> IndexMap<String, String>;
}

/// A definition file that could not be turned into an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedDefinition {
    pub path: PathBuf,
    pub reason: String,
}

/// Entries written to disk on first open when missing.
#[derive(Debug, Default)]
pub struct RegistryDefaults {
    entries: Vec<SiteConfigDef>,
}

impl RegistryDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default entry.
    pub fn entry(mut self, def: SiteConfigDef) -> Self {
        self.entries.push(def);
        self
    }

    pub fn entries(&self) -> &[SiteConfigDef] {
        &self.entries
    }
}

/// Builder for [`SiteConfigRegistry`]. Created by [`SiteConfigRegistry::open`].
pub struct SiteConfigRegistryBuilder {
    root: PathBuf,
    defaults: Option<RegistryDefaults>,
}

impl SiteConfigRegistryBuilder {
    /// Seed these entries when no file with their id exists yet.
    pub fn with_defaults(mut self, defaults: RegistryDefaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Create the directory, seed defaults, load every definition.
    pub async fn build(self) -> Result<SiteConfigRegistry> {
        fs::create_dir_all(&self.root).await?;

        if let Some(defaults) = &self.defaults {
            seed_defaults(&self.root, defaults).await?;
        }

        let mut registry = SiteConfigRegistry {
            root: Some(self.root),
            ..SiteConfigRegistry::default()
        };
        registry.load_definitions().await?;

        debug!(
            entries = registry.definitions.len(),
            rejected = registry.rejected.len(),
            "site config registry opened"
        );

        Ok(registry)
    }
}

async fn seed_defaults(root: &Path, defaults: &RegistryDefaults) -> Result<()> {
    for def in defaults.entries() {
        let path = definition_path(root, &def.id);
        if !path.exists() {
            let yaml = serde_yaml::to_string(def)?;
            atomic_write(&path, yaml.as_bytes()).await?;
            debug!(id = %def.id, "seeded default site config entry");
        }
    }
    Ok(())
}

fn definition_path(root: &Path, id: &str) -> PathBuf {
    root.join(format!("{id}.yaml"))
}

/// Registry of site config entries keyed by id, iterated in id order.
#[derive(Default)]
pub struct SiteConfigRegistry {
    root: Option<PathBuf>,
    definitions: IndexMap<String, SiteConfigDef>,
    rejected: Vec<RejectedDefinition>,
    options: HashMap<String, Arc<dyn OptionsProvider>>,
}

impl fmt::Debug for SiteConfigRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteConfigRegistry")
            .field("root", &self.root)
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("rejected", &self.rejected)
            .finish()
    }
}

impl SiteConfigRegistry {
    /// Open or create a definitions directory.
    ///
    /// ```rust,ignore
    /// let registry = SiteConfigRegistry::open("config/site_config")
    ///     .with_defaults(my_defaults())
    ///     .build()
    ///     .await?;
    /// ```
    pub fn open(root: impl Into<PathBuf>) -> SiteConfigRegistryBuilder {
        SiteConfigRegistryBuilder {
            root: root.into(),
            defaults: None,
        }
    }

    /// Build an in-memory registry. Later duplicates of an id are rejected.
    pub fn from_definitions(defs: impl IntoIterator<Item = SiteConfigDef>) -> Self {
        let mut registry = Self::default();
        for def in defs {
            if let Err(e) = registry.insert(def) {
                warn!(%e, "skipping site config entry");
            }
        }
        registry.definitions.sort_keys();
        registry
    }

    /// Attach an options hook to an entry.
    pub fn with_options_provider(
        mut self,
        id: impl Into<String>,
        provider: Arc<dyn OptionsProvider>,
    ) -> Self {
        self.options.insert(id.into(), provider);
        self
    }

    /// All entries, in id order.
    pub fn get_definitions(&self) -> impl Iterator<Item = &SiteConfigDef> {
        self.definitions.values()
    }

    pub fn get_definition(&self, id: &str) -> Option<&SiteConfigDef> {
        self.definitions.get(id)
    }

    pub fn has_definition(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definition files skipped at load because they were invalid.
    pub fn rejected(&self) -> &[RejectedDefinition] {
        &self.rejected
    }

    pub fn options_provider(&self, id: &str) -> Option<&Arc<dyn OptionsProvider>> {
        self.options.get(id)
    }

    /// Write (create or update) an entry. Persists to YAML when disk-backed.
    pub async fn write_definition(&mut self, def: &SiteConfigDef) -> Result<()> {
        if let Some(root) = &self.root {
            let yaml = serde_yaml::to_string(def)?;
            atomic_write(&definition_path(root, &def.id), yaml.as_bytes()).await?;
        }
        self.definitions.insert(def.id.clone(), def.clone());
        self.definitions.sort_keys();
        Ok(())
    }

    /// The definitions directory, if disk-backed.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn insert(&mut self, def: SiteConfigDef) -> Result<()> {
        if self.definitions.contains_key(&def.id) {
            return Err(FieldsError::DuplicateDefinition { id: def.id });
        }
        self.definitions.insert(def.id.clone(), def);
        Ok(())
    }

    fn reject(&mut self, path: PathBuf, reason: String) {
        error!(?path, %reason, "skipping invalid site config definition");
        self.rejected.push(RejectedDefinition { path, reason });
    }

    async fn load_definitions(&mut self) -> Result<()> {
        let Some(root) = self.root.clone() else {
            return Ok(());
        };
        if !root.is_dir() {
            return Err(FieldsError::NotInitialized { path: root });
        }

        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml" | "yml")
            ) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let content = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.reject(path, e.to_string());
                    continue;
                }
            };
            match serde_yaml::from_slice::<SiteConfigDef>(&content) {
                Ok(def) => {
                    if let Err(e) = self.insert(def) {
                        self.reject(path, e.to_string());
                    }
                }
                Err(e) => self.reject(path, e.to_string()),
            }
        }
        self.definitions.sort_keys();
        Ok(())
    }
}

/// Write to a temp file then rename for atomic persistence.
async fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"))?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
