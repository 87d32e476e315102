//! Site configuration values driven by field schemas
//!
//! Entries declared in a [`SiteConfigRegistry`](site_config_fields::SiteConfigRegistry)
//! hold named fields. This crate reads their stored values, resolves entity
//! references, and shapes the result for the read APIs and the settings form:
//!
//! - [`ResolutionEngine`] reads raw values and resolves references
//! - [`normalize`](normalize::normalize) turns loaded entities into plain JSON
//! - [`FormSchemaBuilder`] builds the editable form tree
//! - [`SiteConfigService`] ties them together and invalidates response caches
//! - [`resource`] builds the JSON:API and REST documents
//!
//! ```rust,ignore
//! let settings = Settings::load(None)?;
//! let service = SiteConfigService::from_settings(&settings).await?;
//! service.set_value("footer", "copyright", json!("© 2024"))?;
//! let footer = service.get_site_config_by_id("footer");
//! ```

pub mod cache;
pub mod engine;
pub mod entity;
pub mod error;
pub mod form;
pub mod language;
pub mod normalize;
pub mod resolve;
pub mod resource;
pub mod service;
pub mod settings;

pub use cache::{
    CacheTagsInvalidator, CacheableMetadata, MemoryCacheTags, LANGUAGE_CACHE_CONTEXT,
    SITE_CONFIG_CACHE_TAG,
};
pub use engine::ResolutionEngine;
pub use entity::{Entity, EntityStorage, MemoryEntityStorage, Translation};
pub use error::{EntityError, Result, SettingsError, SiteConfigError};
pub use form::{EntryForm, FormElement, FormSchemaBuilder, FormView, WidgetRegistry, WidgetSet};
pub use language::{is_valid_langcode, FixedLanguage, LanguageContext, DEFAULT_LANGCODE};
pub use resolve::{ReferenceResolver, ResolvedValue, ResolvedValues};
pub use resource::CacheableResponse;
pub use service::{SiteConfigService, SiteConfigServiceBuilder, SiteConfigValues};
pub use settings::Settings;
