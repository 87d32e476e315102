//! Resolved values and the reference resolver.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::entity::{Entity, EntityStorage};
use crate::error::EntityError;

/// Resolved values of every field of an entry, in declared order.
pub type ResolvedValues = IndexMap<String, ResolvedValue>;

/// The result of resolving one stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// Stored value, passed through as-is.
    Raw(Value),
    /// A reference that was loaded.
    Entity(Box<Entity>),
    /// Elements of a multivalue field, in stored order.
    List(Vec<ResolvedValue>),
    /// One multivalue element, keyed by sub-field name in stored order.
    Record(IndexMap<String, ResolvedValue>),
}

impl ResolvedValue {
    pub fn null() -> Self {
        ResolvedValue::Raw(Value::Null)
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            ResolvedValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            ResolvedValue::Raw(value) => Some(value),
            _ => None,
        }
    }

    /// True for an empty raw value or a list with no elements.
    pub fn is_empty(&self) -> bool {
        match self {
            ResolvedValue::Raw(value) => is_empty_value(value),
            ResolvedValue::List(items) => items.is_empty(),
            ResolvedValue::Record(fields) => fields.is_empty(),
            ResolvedValue::Entity(_) => false,
        }
    }
}

impl From<Entity> for ResolvedValue {
    fn from(entity: Entity) -> Self {
        ResolvedValue::Entity(Box::new(entity))
    }
}

impl From<Value> for ResolvedValue {
    fn from(value: Value) -> Self {
        ResolvedValue::Raw(value)
    }
}

/// Whether a stored value counts as "nothing stored".
///
/// Null, `false`, zero, the empty string, `"0"`, and empty arrays or objects
/// are empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Loads the entity a stored id points at.
#[derive(Clone)]
pub struct ReferenceResolver {
    entities: Arc<dyn EntityStorage>,
}

impl ReferenceResolver {
    pub fn new(entities: Arc<dyn EntityStorage>) -> Self {
        Self { entities }
    }

    /// Load `raw` as an entity of `target_type`, in `langcode` when translated.
    ///
    /// Returns `Ok(None)` without touching storage when `raw` is empty.
    pub fn resolve(
        &self,
        raw: &Value,
        target_type: &str,
        langcode: &str,
    ) -> Result<Option<Entity>, EntityError> {
        if is_empty_value(raw) {
            return Ok(None);
        }
        let id = entity_id(raw, target_type)?;
        let entity = self
            .entities
            .load(target_type, &id)?
            .ok_or_else(|| EntityError::NotFound {
                entity_type: target_type.to_string(),
                id: id.clone(),
            })?;

        if entity.has_translation(langcode) {
            if let Some(translated) = entity.get_translation(langcode) {
                return Ok(Some(translated));
            }
        }
        Ok(Some(entity))
    }
}

/// Scalar ids only; anything else cannot address an entity.
fn entity_id(raw: &Value, target_type: &str) -> Result<String, EntityError> {
    match raw {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(EntityError::InvalidId {
            entity_type: target_type.to_string(),
            id: other.to_string(),
        }),
    }
}
