//! SiteConfigService: the entry point used by the read APIs, the settings
//! form and the CLI.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use site_config_fields::{SiteConfigDef, SiteConfigRegistry};
use site_config_store::{
    FileStateStore, MemoryConfigStore, MemoryStateStore, ValueStore, YamlConfigStore,
};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheTagsInvalidator, MemoryCacheTags, SITE_CONFIG_CACHE_TAG};
use crate::engine::ResolutionEngine;
use crate::entity::{EntityStorage, MemoryEntityStorage};
use crate::error::Result;
use crate::form::{EntryForm, FormSchemaBuilder, WidgetRegistry, WidgetSet};
use crate::language::{FixedLanguage, LanguageContext};
use crate::normalize::{normalize, normalize_values};
use crate::resolve::ResolvedValues;
use crate::settings::Settings;

/// Normalized values of every entry, keyed by entry id in id order.
pub type SiteConfigValues = IndexMap<String, Map<String, Value>>;

/// Builder for [`SiteConfigService`]. Created by [`SiteConfigService::builder`].
///
/// Anything not supplied is kept in memory.
pub struct SiteConfigServiceBuilder {
    registry: Arc<SiteConfigRegistry>,
    store: Option<ValueStore>,
    entities: Option<Arc<dyn EntityStorage>>,
    language: Option<Arc<dyn LanguageContext>>,
    cache: Option<Arc<dyn CacheTagsInvalidator>>,
    widgets: Option<Arc<dyn WidgetRegistry>>,
}

impl SiteConfigServiceBuilder {
    pub fn store(mut self, store: ValueStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn entities(mut self, entities: Arc<dyn EntityStorage>) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn language(mut self, language: Arc<dyn LanguageContext>) -> Self {
        self.language = Some(language);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn CacheTagsInvalidator>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn widgets(mut self, widgets: Arc<dyn WidgetRegistry>) -> Self {
        self.widgets = Some(widgets);
        self
    }

    pub fn build(self) -> SiteConfigService {
        let store = self.store.unwrap_or_else(|| {
            ValueStore::new(
                Arc::new(MemoryStateStore::new()),
                Arc::new(MemoryConfigStore::new()),
            )
        });
        let entities = self
            .entities
            .unwrap_or_else(|| Arc::new(MemoryEntityStorage::new()));
        let language = self
            .language
            .unwrap_or_else(|| Arc::new(FixedLanguage::default()));

        SiteConfigService {
            registry: self.registry,
            engine: ResolutionEngine::new(store, entities, language),
            cache: self.cache.unwrap_or_else(|| Arc::new(MemoryCacheTags::new())),
            widgets: self.widgets.unwrap_or_else(|| Arc::new(WidgetSet::default())),
        }
    }
}

/// Reads, writes and edits site config values.
///
/// Cheap to clone; clones share stores, entities and the cache invalidator.
#[derive(Clone)]
pub struct SiteConfigService {
    registry: Arc<SiteConfigRegistry>,
    engine: ResolutionEngine,
    cache: Arc<dyn CacheTagsInvalidator>,
    widgets: Arc<dyn WidgetRegistry>,
}

impl fmt::Debug for SiteConfigService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteConfigService")
            .field("registry", &self.registry)
            .field("langcode", &self.langcode())
            .finish_non_exhaustive()
    }
}

impl SiteConfigService {
    pub fn builder(registry: Arc<SiteConfigRegistry>) -> SiteConfigServiceBuilder {
        SiteConfigServiceBuilder {
            registry,
            store: None,
            entities: None,
            language: None,
            cache: None,
            widgets: None,
        }
    }

    /// Open the on-disk registry, stores and entities named by `settings`.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let registry = SiteConfigRegistry::open(&settings.definitions_dir)
            .build()
            .await?;
        for rejected in registry.rejected() {
            warn!(path = ?rejected.path, reason = %rejected.reason, "site config entry excluded");
        }

        let store = ValueStore::new(
            Arc::new(FileStateStore::open(settings.state_file())?),
            Arc::new(YamlConfigStore::open(settings.config_dir())?),
        )
        .with_namespace(&settings.namespace);
        let entities = MemoryEntityStorage::load_dir(&settings.entities_dir).await?;

        let widgets = if settings.multivalue_widget {
            WidgetSet::default()
        } else {
            WidgetSet::core()
        };

        info!(
            entries = registry.len(),
            namespace = %settings.namespace,
            language = %settings.default_language,
            "site config service ready"
        );

        Ok(Self::builder(Arc::new(registry))
            .store(store)
            .entities(Arc::new(entities))
            .language(Arc::new(FixedLanguage::new(&settings.default_language)))
            .widgets(Arc::new(widgets))
            .build())
    }

    /// The same service answering in `langcode`.
    pub fn with_language(&self, langcode: &str) -> Self {
        Self {
            engine: self
                .engine
                .with_language(Arc::new(FixedLanguage::new(langcode))),
            ..self.clone()
        }
    }

    pub fn langcode(&self) -> &str {
        self.engine.langcode()
    }

    pub fn registry(&self) -> &SiteConfigRegistry {
        &self.registry
    }

    /// Normalized values of every entry.
    pub fn get_site_config(&self) -> SiteConfigValues {
        self.registry
            .get_definitions()
            .map(|def| (def.id.clone(), self.normalized(def)))
            .collect()
    }

    /// Normalized values of entry `id`; empty for an unknown id.
    pub fn get_site_config_by_id(&self, id: &str) -> Map<String, Value> {
        match self.definition(id) {
            Some(def) => self.normalized(def),
            None => Map::new(),
        }
    }

    /// Resolved values of entry `id`, with live entities.
    pub fn get_resolved_values(&self, id: &str) -> Option<ResolvedValues> {
        self.definition(id).map(|def| self.engine.get_values(def))
    }

    /// Normalized value of one field, or `default` when the entry or field is unknown.
    pub fn get_value(&self, entry: &str, field: &str, default: Option<Value>) -> Value {
        let resolved = self
            .definition(entry)
            .and_then(|def| self.engine.get_value(def, field));
        match resolved {
            Some(value) => normalize(&value),
            None => {
                debug!(entry, field, "unknown site config field, using default");
                default.unwrap_or(Value::Null)
            }
        }
    }

    /// Store `value` as field `field` of `entry` and invalidate cached responses.
    ///
    /// Unknown entries are logged and ignored.
    pub fn set_value(&self, entry: &str, field: &str, value: Value) -> Result<()> {
        let Some(def) = self.definition(entry) else {
            return Ok(());
        };
        self.engine.set_value(def, field, value)?;
        self.cache.invalidate_tags(&[SITE_CONFIG_CACHE_TAG]);
        Ok(())
    }

    /// Form group for entry `id`; `None` for unknown ids and entries without fields.
    pub fn build_form_schema(&self, id: &str) -> Option<EntryForm> {
        let def = self.definition(id)?;
        self.entry_form(def)
    }

    /// Form groups of every entry that has fields.
    pub fn build_settings_form(&self) -> Vec<EntryForm> {
        self.registry
            .get_definitions()
            .filter_map(|def| self.entry_form(def))
            .collect()
    }

    /// Store a submitted settings form: `{<entry id>: {<field>: value}}`.
    ///
    /// Only declared fields of known entries are written. Failing fields are
    /// logged and skipped. Cached responses are invalidated once for the
    /// whole submission. Returns the number of fields written.
    pub fn submit_settings_form(&self, submitted: &Map<String, Value>) -> usize {
        let mut written = 0;
        for def in self.registry.get_definitions() {
            let Some(Value::Object(values)) = submitted.get(&def.id) else {
                continue;
            };
            for (field, value) in values {
                if def.get_field(field).is_none() {
                    debug!(entry = %def.id, field = %field, "ignoring undeclared field");
                    continue;
                }
                match self.engine.set_value(def, field, value.clone()) {
                    Ok(()) => written += 1,
                    Err(e) => error!(
                        entry = %def.id,
                        field = %field,
                        error = %e,
                        "failed to save site config value"
                    ),
                }
            }
        }
        if written > 0 {
            self.cache.invalidate_tags(&[SITE_CONFIG_CACHE_TAG]);
        }
        info!(written, "settings form saved");
        written
    }

    fn entry_form(&self, def: &SiteConfigDef) -> Option<EntryForm> {
        let values = self.engine.get_values(def);
        FormSchemaBuilder::new(self.widgets.as_ref())
            .with_options(self.registry.options_provider(&def.id).map(Arc::as_ref))
            .build(def, &values)
    }

    fn normalized(&self, def: &SiteConfigDef) -> Map<String, Value> {
        normalize_values(&def.id, &self.engine.get_values(def))
    }

    fn definition(&self, id: &str) -> Option<&SiteConfigDef> {
        let def = self.registry.get_definition(id);
        if def.is_none() {
            warn!(entry = id, "unknown site config entry");
        }
        def
    }
}

