//! Output normalization: resolved values to the plain shape the read APIs emit.
//!
//! Loaded entities become
//! `{type: "<entity type>--<bundle>", id: <uuid>, drupal_internal__id: <id>, url}`.
//! Everything else is already plain and is emitted unchanged, so normalizing
//! plain values is a no-op.

use serde_json::{json, Map, Value};
use tracing::error;

use crate::entity::Entity;
use crate::error::EntityError;
use crate::resolve::{ResolvedValue, ResolvedValues};

/// External shape of a referenced entity.
///
/// Files report their stored location as `url`; they have no page of their own.
pub fn entity_shape(entity: &Entity) -> Result<Value, EntityError> {
    let url = entity.to_url()?;
    Ok(json!({
        "type": entity.type_name(),
        "id": entity.uuid,
        "drupal_internal__id": entity.id,
        "url": url,
    }))
}

/// Normalize every field of entry `entry_id`, keeping declared order.
pub fn normalize_values(entry_id: &str, values: &ResolvedValues) -> Map<String, Value> {
    values
        .iter()
        .map(|(field, value)| (field.clone(), normalize_at(entry_id, field, value)))
        .collect()
}

/// Normalize a single resolved value.
pub fn normalize(value: &ResolvedValue) -> Value {
    normalize_at("", "", value)
}

fn normalize_at(entry: &str, path: &str, value: &ResolvedValue) -> Value {
    match value {
        ResolvedValue::Raw(raw) => raw.clone(),
        ResolvedValue::Entity(entity) => match entity_shape(entity) {
            Ok(shape) => shape,
            Err(e) => {
                error!(entry, field = path, error = %e, "failed to normalize referenced entity");
                Value::Object(Map::new())
            }
        },
        ResolvedValue::List(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| normalize_at(entry, &format!("{path}[{index}]"), item))
                .collect(),
        ),
        ResolvedValue::Record(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, sub)| {
                    (name.clone(), normalize_at(entry, &format!("{path}.{name}"), sub))
                })
                .collect(),
        ),
    }
}
