//! Value resolution: stored values in, resolved values out.
//!
//! For each field the engine reads the raw value from the entry's store and
//! then, depending on the field type, passes it through, loads the entity it
//! references, or walks the records of a multivalue field resolving the
//! reference and file sub-fields. Failures stay local to the field (or
//! sub-field) that hit them.

use std::sync::Arc;

use serde_json::Value;
use site_config_fields::{FieldDef, FieldType, SiteConfigDef, FILE_ENTITY_TYPE};
use site_config_store::{StoreError, ValueStore};
use tracing::{debug, error};

use crate::entity::EntityStorage;
use crate::language::LanguageContext;
use crate::resolve::{is_empty_value, ReferenceResolver, ResolvedValue, ResolvedValues};

/// Resolves the stored values of site config entries.
#[derive(Clone)]
pub struct ResolutionEngine {
    store: ValueStore,
    references: ReferenceResolver,
    language: Arc<dyn LanguageContext>,
}

impl ResolutionEngine {
    pub fn new(
        store: ValueStore,
        entities: Arc<dyn EntityStorage>,
        language: Arc<dyn LanguageContext>,
    ) -> Self {
        Self {
            store,
            references: ReferenceResolver::new(entities),
            language,
        }
    }

    /// Same stores and entities, answering in another language.
    pub fn with_language(&self, language: Arc<dyn LanguageContext>) -> Self {
        Self {
            language,
            ..self.clone()
        }
    }

    pub fn langcode(&self) -> &str {
        self.language.current_language()
    }

    /// Resolved value of one field, or `None` if `def` declares no such field.
    pub fn get_value(&self, def: &SiteConfigDef, field: &str) -> Option<ResolvedValue> {
        let field_def = def.get_field(field)?;
        Some(self.resolve_stored(def, field, field_def))
    }

    /// Resolved values of every declared field, in declared order.
    pub fn get_values(&self, def: &SiteConfigDef) -> ResolvedValues {
        def.fields
            .iter()
            .map(|(name, field_def)| {
                (name.clone(), self.resolve_stored(def, name, field_def))
            })
            .collect()
    }

    /// Store the raw value of `field`.
    pub fn set_value(
        &self,
        def: &SiteConfigDef,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let key = self.store.storage_key(def, self.langcode());
        debug!(entry = %def.id, field, key = %key, "writing site config value");
        self.store.write(def.storage, &key, field, value)
    }

    fn resolve_stored(
        &self,
        def: &SiteConfigDef,
        name: &str,
        field_def: &FieldDef,
    ) -> ResolvedValue {
        let key = self.store.storage_key(def, self.langcode());
        let raw = match self.store.read(def.storage, &key, name) {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    entry = %def.id,
                    field = name,
                    error = %e,
                    "failed to read site config value"
                );
                return ResolvedValue::null();
            }
        };

        if is_empty_value(&raw) {
            return ResolvedValue::Raw(raw);
        }

        let scope = Scope {
            entry: &def.id,
            path: name.to_string(),
        };
        match &field_def.field_type {
            // Top-level file fields keep their id list; the form widget edits ids.
            FieldType::File => ResolvedValue::Raw(raw),
            field_type => self.resolve_field(&scope, field_type, raw),
        }
    }

    /// Resolve `raw` according to `field_type`, recursing into multivalue records.
    fn resolve_field(
        &self,
        scope: &Scope<'_>,
        field_type: &FieldType,
        raw: Value,
    ) -> ResolvedValue {
        match field_type {
            FieldType::Plain { .. } => ResolvedValue::Raw(raw),
            FieldType::Reference { target_type, .. } => {
                self.resolve_reference(scope, raw, target_type)
            }
            FieldType::File => self.resolve_file(scope, raw),
            FieldType::Multivalue { fields } => {
                let items = match raw {
                    Value::Array(items) => items,
                    other => return ResolvedValue::Raw(other),
                };
                let elements = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let record = match item {
                            Value::Object(record) => record,
                            other => return ResolvedValue::Raw(other),
                        };
                        let resolved = record
                            .into_iter()
                            .map(|(sub_name, sub_raw)| {
                                let resolved = match fields.get(&sub_name) {
                                    Some(sub_def) => {
                                        let sub_scope = scope.child(index, &sub_name);
                                        self.resolve_field(&sub_scope, &sub_def.field_type, sub_raw)
                                    }
                                    None => ResolvedValue::Raw(sub_raw),
                                };
                                (sub_name, resolved)
                            })
                            .collect();
                        ResolvedValue::Record(resolved)
                    })
                    .collect();
                ResolvedValue::List(elements)
            }
        }
    }

    fn resolve_reference(
        &self,
        scope: &Scope<'_>,
        raw: Value,
        target_type: &str,
    ) -> ResolvedValue {
        match self.references.resolve(&raw, target_type, self.langcode()) {
            Ok(Some(entity)) => entity.into(),
            Ok(None) => ResolvedValue::Raw(raw),
            Err(e) => {
                error!(
                    entry = scope.entry,
                    field = %scope.path,
                    error = %e,
                    "failed to resolve site config reference"
                );
                ResolvedValue::Raw(raw)
            }
        }
    }

    /// File widgets store a list of file ids; the first one is the file.
    fn resolve_file(&self, scope: &Scope<'_>, raw: Value) -> ResolvedValue {
        let first = match &raw {
            Value::Array(ids) => ids.first().cloned(),
            scalar => Some(scalar.clone()),
        };
        let Some(first) = first else {
            return ResolvedValue::Raw(raw);
        };
        match self.resolve_reference(scope, first, FILE_ENTITY_TYPE) {
            ResolvedValue::Entity(file) => ResolvedValue::Entity(file),
            _ => ResolvedValue::Raw(raw),
        }
    }
}

/// Where in an entry a value sits, for log context.
struct Scope<'a> {
    entry: &'a str,
    path: String,
}

impl Scope<'_> {
    fn child(&self, index: usize, sub_field: &str) -> Self {
        Scope {
            entry: self.entry,
            path: format!("{}[{index}].{sub_field}", self.path),
        }
    }
}
