//! Core schema types for site configuration entries.
//!
//! An entry ([`SiteConfigDef`]) names a group of settings, the store its values
//! live in, and an ordered map of typed fields. Field types form a closed set
//! ([`FieldType`]); every widget name that is not one of the structural types
//! is a display-only variant of [`FieldType::Plain`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FieldsError;

/// Widget used when a field declares no `type`.
pub const DEFAULT_WIDGET: &str = "textfield";

/// Entity type referenced when a reference field declares no `target_type`.
pub const DEFAULT_TARGET_TYPE: &str = "node";

/// Entity type that file fields resolve against.
pub const FILE_ENTITY_TYPE: &str = "file";

/// Widget name of a reference field.
pub const REFERENCE_WIDGET: &str = "entity_autocomplete";

/// Widget name of a file upload field.
pub const FILE_WIDGET: &str = "managed_file";

/// Widget name of a composite field.
pub const MULTIVALUE_WIDGET: &str = "multivalue";

/// Widget name of an enumerated choice field.
pub const SELECT_WIDGET: &str = "select";

/// Which backing store holds an entry's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Storage {
    /// Mutable runtime state, one key per field.
    #[default]
    #[serde(rename = "status", alias = "state", alias = "ephemeral")]
    State,
    /// Structured configuration object, one object per entry.
    #[serde(rename = "config", alias = "structured")]
    Config,
}

/// The type of a field — determines how its stored value is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Value passes through unchanged. `widget` is the form element to edit it with.
    Plain { widget: String },
    /// Stores the id of another entity.
    Reference {
        target_type: String,
        selection_settings: Map<String, Value>,
    },
    /// Stores a list of file entity ids; the first one is the file.
    File,
    /// A list of records, each keyed by the nested field names.
    Multivalue { fields: IndexMap<String, FieldDef> },
}

impl FieldType {
    /// Widget name used to edit this field.
    pub fn widget(&self) -> &str {
        match self {
            FieldType::Plain { widget } => widget,
            FieldType::Reference { .. } => REFERENCE_WIDGET,
            FieldType::File => FILE_WIDGET,
            FieldType::Multivalue { .. } => MULTIVALUE_WIDGET,
        }
    }
}

/// A field definition — the schema for one named setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldDef", into = "RawFieldDef")]
pub struct FieldDef {
    pub label: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    /// Static choices for select widgets, value → label.
    pub options: Option<IndexMap<String, String>>,
    pub field_type: FieldType,
}

impl FieldDef {
    fn with_type(field_type: FieldType) -> Self {
        Self {
            label: None,
            description: None,
            required: false,
            options: None,
            field_type,
        }
    }

    /// Shorthand for a plain field edited with `widget`.
    pub fn plain(widget: impl Into<String>) -> Self {
        Self::with_type(FieldType::Plain {
            widget: widget.into(),
        })
    }

    /// Shorthand for a single-line text field.
    pub fn text() -> Self {
        Self::plain(DEFAULT_WIDGET)
    }

    /// Shorthand for a select field with static options.
    pub fn select<I, K, V>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut def = Self::plain(SELECT_WIDGET);
        def.options = Some(
            options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        def
    }

    /// Shorthand for a reference to an entity of `target_type`.
    pub fn reference(target_type: impl Into<String>) -> Self {
        Self::with_type(FieldType::Reference {
            target_type: target_type.into(),
            selection_settings: Map::new(),
        })
    }

    /// Shorthand for a file upload field.
    pub fn file() -> Self {
        Self::with_type(FieldType::File)
    }

    /// Shorthand for a composite field with the given sub-fields.
    pub fn multivalue<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldDef)>,
        K: Into<String>,
    {
        Self::with_type(FieldType::Multivalue {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Widget name used to edit this field.
    pub fn widget(&self) -> &str {
        self.field_type.widget()
    }
}

/// On-disk shape of a field definition. The `type` key is a free-form widget
/// name; conversion maps it onto the closed [`FieldType`] set.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFieldDef {
    #[serde(rename = "type", default = "default_widget")]
    type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_type: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    selection_settings: Map<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    fields: IndexMap<String, RawFieldDef>,
}

fn default_widget() -> String {
    DEFAULT_WIDGET.to_string()
}

impl RawFieldDef {
    fn into_field_def(self) -> Result<FieldDef, FieldsError> {
        let field_type = match self.type_.as_str() {
            REFERENCE_WIDGET => FieldType::Reference {
                target_type: self
                    .target_type
                    .unwrap_or_else(|| DEFAULT_TARGET_TYPE.to_string()),
                selection_settings: self.selection_settings,
            },
            FILE_WIDGET => FieldType::File,
            MULTIVALUE_WIDGET => {
                let mut fields = IndexMap::with_capacity(self.fields.len());
                for (name, sub) in self.fields {
                    if sub.type_ == MULTIVALUE_WIDGET {
                        return Err(FieldsError::NestedMultivalue { sub_field: name });
                    }
                    fields.insert(name, sub.into_field_def()?);
                }
                FieldType::Multivalue { fields }
            }
            _ => FieldType::Plain { widget: self.type_ },
        };

        Ok(FieldDef {
            label: self.label,
            description: self.description,
            required: self.required,
            options: self.options,
            field_type,
        })
    }
}

impl TryFrom<RawFieldDef> for FieldDef {
    type Error = FieldsError;

    fn try_from(raw: RawFieldDef) -> Result<Self, Self::Error> {
        raw.into_field_def()
    }
}

impl From<FieldDef> for RawFieldDef {
    fn from(def: FieldDef) -> Self {
        let type_ = def.widget().to_string();
        let (target_type, selection_settings, fields) = match def.field_type {
            FieldType::Reference {
                target_type,
                selection_settings,
            } => (Some(target_type), selection_settings, IndexMap::new()),
            FieldType::Multivalue { fields } => (
                None,
                Map::new(),
                fields.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
            FieldType::Plain { .. } | FieldType::File => (None, Map::new(), IndexMap::new()),
        };
        RawFieldDef {
            type_,
            label: def.label,
            description: def.description,
            required: def.required,
            options: def.options,
            target_type,
            selection_settings,
            fields,
        }
    }
}

/// A site configuration entry — a named group of settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfigDef {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub storage: Storage,
    /// Whether values are stored per interface language.
    #[serde(default)]
    pub translatable: bool,
    #[serde(default)]
    pub fields: IndexMap<String, FieldDef>,
}

impl SiteConfigDef {
    pub fn new(id: impl Into<String>, label: impl Into<String>, storage: Storage) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            storage,
            translatable: false,
            fields: IndexMap::new(),
        }
    }

    /// Append a field, keeping declaration order.
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn translatable(mut self) -> Self {
        self.translatable = true;
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_accepts_legacy_and_descriptive_names() {
        let state: Storage = serde_yaml::from_str("status").unwrap();
        assert_eq!(state, Storage::State);
        let state: Storage = serde_yaml::from_str("ephemeral").unwrap();
        assert_eq!(state, Storage::State);
        let config: Storage = serde_yaml::from_str("structured").unwrap();
        assert_eq!(config, Storage::Config);
        assert_eq!(serde_yaml::to_string(&Storage::Config).unwrap().trim(), "config");
    }

    #[test]
    fn storage_rejects_unknown_value() {
        assert!(serde_yaml::from_str::<Storage>("database").is_err());
    }

    #[test]
    fn untyped_field_is_plain_text() {
        let def: FieldDef = serde_yaml::from_str("label: Title").unwrap();
        assert_eq!(
            def.field_type,
            FieldType::Plain {
                widget: "textfield".into()
            }
        );
        assert_eq!(def.label.as_deref(), Some("Title"));
        assert!(!def.required);
    }

    #[test]
    fn reference_defaults_target_type() {
        let def: FieldDef = serde_yaml::from_str("type: entity_autocomplete").unwrap();
        match def.field_type {
            FieldType::Reference {
                target_type,
                selection_settings,
            } => {
                assert_eq!(target_type, "node");
                assert!(selection_settings.is_empty());
            }
            other => panic!("expected reference, got {other:?}"),
        }
    }

    #[test]
    fn reference_keeps_selection_settings() {
        let yaml = r#"
type: entity_autocomplete
target_type: taxonomy_term
selection_settings:
  target_bundles: [tags]
"#;
        let def: FieldDef = serde_yaml::from_str(yaml).unwrap();
        let FieldType::Reference {
            target_type,
            selection_settings,
        } = def.field_type
        else {
            panic!("expected reference");
        };
        assert_eq!(target_type, "taxonomy_term");
        assert_eq!(
            selection_settings.get("target_bundles"),
            Some(&serde_json::json!(["tags"]))
        );
    }

    #[test]
    fn multivalue_preserves_sub_field_order() {
        let yaml = r#"
type: multivalue
label: Links
fields:
  title: { type: textfield }
  target: { type: entity_autocomplete, target_type: page }
  icon: { type: managed_file }
"#;
        let def: FieldDef = serde_yaml::from_str(yaml).unwrap();
        let FieldType::Multivalue { fields } = &def.field_type else {
            panic!("expected multivalue");
        };
        let names: Vec<_> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, ["title", "target", "icon"]);
        assert_eq!(fields["icon"].field_type, FieldType::File);
    }

    #[test]
    fn nested_multivalue_is_rejected() {
        let yaml = r#"
type: multivalue
fields:
  children: { type: multivalue }
"#;
        let err = serde_yaml::from_str::<FieldDef>(yaml).unwrap_err();
        assert!(err.to_string().contains("children"));
    }

    #[test]
    fn field_def_yaml_round_trip() {
        let def = FieldDef::multivalue([
            ("title", FieldDef::text().with_label("Title").required()),
            ("target", FieldDef::reference("page")),
        ])
        .with_label("Links");
        let yaml = serde_yaml::to_string(&def).unwrap();
        let parsed: FieldDef = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(def, parsed);
    }

    #[test]
    fn select_shorthand_keeps_option_order() {
        let def = FieldDef::select([("b", "Bee"), ("a", "Ay")]);
        assert_eq!(def.widget(), "select");
        let keys: Vec<_> = def.options.unwrap().into_keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn site_config_def_defaults() {
        let yaml = r#"
id: footer
label: Footer
fields:
  copyright: { label: Copyright }
"#;
        let def: SiteConfigDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.storage, Storage::State);
        assert!(!def.translatable);
        assert!(def.get_field("copyright").is_some());
    }
}
