//! Site config schemas and registry
//!
//! `site-config-fields` owns the declarative side of site configuration: which
//! entries exist, which store holds their values, and which typed fields each
//! entry declares. It knows nothing about stored values or entities.
//!
//! # Architecture
//!
//! - **Closed field types**: plain, reference, file and multivalue fields are
//!   variants of [`FieldType`]; any other widget name is a plain field
//! - **YAML on disk**: one `.yaml` file per entry, loaded once at startup
//! - **Fail per entry**: a definition that does not parse (for example an
//!   unknown `storage`) is logged and skipped, the rest still load

pub mod error;
pub mod registry;
pub mod types;

pub use error::{FieldsError, Result};
pub use registry::{
    OptionsProvider, RegistryDefaults, RejectedDefinition, SiteConfigRegistry,
    SiteConfigRegistryBuilder,
};
pub use types::{
    FieldDef, FieldType, SiteConfigDef, Storage, DEFAULT_TARGET_TYPE, DEFAULT_WIDGET,
    FILE_ENTITY_TYPE, FILE_WIDGET, MULTIVALUE_WIDGET, REFERENCE_WIDGET, SELECT_WIDGET,
};
