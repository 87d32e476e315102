//! Settings form schema: the editable counterpart of the read APIs.
//!
//! Each entry becomes a collapsed group of widgets, one per field, pre-filled
//! with the engine's resolved values. Reference defaults stay as loaded
//! entities so an entity picker can show them.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use site_config_fields::{
    FieldDef, FieldType, OptionsProvider, SiteConfigDef, DEFAULT_WIDGET, FILE_WIDGET,
    MULTIVALUE_WIDGET, REFERENCE_WIDGET, SELECT_WIDGET,
};
use tracing::{debug, warn};

use crate::normalize::normalize;
use crate::resolve::{ResolvedValue, ResolvedValues};

/// Widget used for the per-entry group.
pub const ENTRY_WIDGET: &str = "details";

/// Label of the empty choice prepended to select widgets.
pub const EMPTY_OPTION_LABEL: &str = "- Select -";

/// Which widgets the editing surface can render.
pub trait WidgetRegistry: Send + Sync {
    fn has_widget(&self, widget: &str) -> bool;
}

/// A fixed set of widget names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSet(BTreeSet<String>);

impl WidgetSet {
    pub fn new<I, S>(widgets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(widgets.into_iter().map(Into::into).collect())
    }

    /// Core widgets only, without the composite `multivalue` widget.
    pub fn core() -> Self {
        Self::new([
            DEFAULT_WIDGET,
            "textarea",
            "text_format",
            "email",
            "url",
            "tel",
            "number",
            "checkbox",
            "checkboxes",
            "radios",
            "date",
            SELECT_WIDGET,
            REFERENCE_WIDGET,
            FILE_WIDGET,
        ])
    }

    pub fn with_widget(mut self, widget: impl Into<String>) -> Self {
        self.0.insert(widget.into());
        self
    }
}

impl Default for WidgetSet {
    fn default() -> Self {
        Self::core().with_widget(MULTIVALUE_WIDGET)
    }
}

impl WidgetRegistry for WidgetSet {
    fn has_widget(&self, widget: &str) -> bool {
        self.0.contains(widget)
    }
}

/// One input widget.
#[derive(Debug, Clone, PartialEq)]
pub struct FormElement {
    pub title: String,
    pub widget: String,
    pub description: Option<String>,
    pub required: bool,
    pub default_value: ResolvedValue,
    /// Label of the empty choice, select widgets only.
    pub empty_option: Option<String>,
    pub options: Option<IndexMap<String, String>>,
    pub target_type: Option<String>,
    pub selection_settings: Option<Map<String, Value>>,
    /// Sub-field widgets of a multivalue element.
    pub children: IndexMap<String, FormElement>,
}

impl FormElement {
    fn new(title: String, widget: String, field: &FieldDef) -> Self {
        Self {
            title,
            widget,
            description: field.description.clone(),
            required: field.required,
            default_value: ResolvedValue::null(),
            empty_option: None,
            options: None,
            target_type: None,
            selection_settings: None,
            children: IndexMap::new(),
        }
    }
}

/// Form group for one site config entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryForm {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub widget: String,
    pub open: bool,
    pub elements: IndexMap<String, FormElement>,
}

/// Builds [`EntryForm`]s from field schemas and resolved values.
pub struct FormSchemaBuilder<'a> {
    widgets: &'a dyn WidgetRegistry,
    options: Option<&'a dyn OptionsProvider>,
}

impl<'a> FormSchemaBuilder<'a> {
    pub fn new(widgets: &'a dyn WidgetRegistry) -> Self {
        Self {
            widgets,
            options: None,
        }
    }

    /// Options hook for select fields without static options.
    pub fn with_options(mut self, options: Option<&'a dyn OptionsProvider>) -> Self {
        self.options = options;
        self
    }

    /// Form group for `def`, or `None` when the entry declares no fields.
    pub fn build(&self, def: &SiteConfigDef, values: &ResolvedValues) -> Option<EntryForm> {
        if def.fields.is_empty() {
            return None;
        }

        let mut elements = IndexMap::new();
        for (name, field) in &def.fields {
            let value = values.get(name).cloned().unwrap_or_else(ResolvedValue::null);
            if let Some(element) = self.element(&def.id, name, field, value) {
                elements.insert(name.clone(), element);
            }
        }

        Some(EntryForm {
            id: def.id.clone(),
            title: def.label.clone(),
            description: def.description.clone(),
            widget: ENTRY_WIDGET.to_string(),
            open: false,
            elements,
        })
    }

    fn element(
        &self,
        entry: &str,
        name: &str,
        field: &FieldDef,
        value: ResolvedValue,
    ) -> Option<FormElement> {
        let title = field.label.clone().unwrap_or_default();

        match &field.field_type {
            FieldType::Multivalue { fields } => {
                if !self.widgets.has_widget(MULTIVALUE_WIDGET) {
                    warn!(
                        entry,
                        field = name,
                        "multivalue widget unavailable, dropping field from form"
                    );
                    return None;
                }
                let mut element = FormElement::new(title, MULTIVALUE_WIDGET.to_string(), field);
                element.default_value = if value.is_empty() {
                    ResolvedValue::List(Vec::new())
                } else {
                    value
                };
                for (sub_name, sub_field) in fields {
                    if let Some(child) =
                        self.element(entry, sub_name, sub_field, ResolvedValue::null())
                    {
                        element.children.insert(sub_name.clone(), child);
                    }
                }
                Some(element)
            }
            FieldType::Reference {
                target_type,
                selection_settings,
            } => {
                let widget = self.widget_name(entry, name, REFERENCE_WIDGET);
                let mut element = FormElement::new(title, widget, field);
                if element.widget == REFERENCE_WIDGET {
                    element.target_type = Some(target_type.clone());
                    element.selection_settings = Some(selection_settings.clone());
                }
                element.default_value = value;
                Some(element)
            }
            field_type => {
                let widget = self.widget_name(entry, name, field_type.widget());
                let mut element = FormElement::new(title, widget, field);
                if element.widget == SELECT_WIDGET {
                    element.empty_option = Some(EMPTY_OPTION_LABEL.to_string());
                    element.options = Some(self.select_options(name, field));
                }
                element.default_value = value;
                Some(element)
            }
        }
    }

    fn widget_name(&self, entry: &str, field: &str, declared: &str) -> String {
        if self.widgets.has_widget(declared) {
            declared.to_string()
        } else {
            debug!(entry, field, widget = declared, "unknown widget, using textfield");
            DEFAULT_WIDGET.to_string()
        }
    }

    fn select_options(&self, name: &str, field: &FieldDef) -> IndexMap<String, String> {
        match (&field.options, self.options) {
            (Some(options), _) => options.clone(),
            (None, Some(provider)) => provider.options(name),
            (None, None) => IndexMap::new(),
        }
    }
}

/// JSON view of a form, with entity defaults normalized for display.
#[derive(Debug, Serialize)]
pub struct FormView {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub widget: String,
    pub open: bool,
    pub elements: IndexMap<String, ElementView>,
}

#[derive(Debug, Serialize)]
pub struct ElementView {
    pub title: String,
    #[serde(rename = "type")]
    pub widget: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub default_value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_settings: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, ElementView>,
}

impl From<&EntryForm> for FormView {
    fn from(form: &EntryForm) -> Self {
        Self {
            id: form.id.clone(),
            title: form.title.clone(),
            description: form.description.clone(),
            widget: form.widget.clone(),
            open: form.open,
            elements: form
                .elements
                .iter()
                .map(|(name, element)| (name.clone(), element.into()))
                .collect(),
        }
    }
}

impl From<&FormElement> for ElementView {
    fn from(element: &FormElement) -> Self {
        Self {
            title: element.title.clone(),
            widget: element.widget.clone(),
            description: element.description.clone(),
            required: element.required,
            default_value: normalize(&element.default_value),
            empty_option: element.empty_option.clone(),
            options: element.options.clone(),
            target_type: element.target_type.clone(),
            selection_settings: element.selection_settings.clone(),
            children: element
                .children
                .iter()
                .map(|(name, child)| (name.clone(), child.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use serde_json::json;
    use site_config_fields::Storage;

    struct Colors;

    impl OptionsProvider for Colors {
        fn options(&self, field_name: &str) -> IndexMap<String, String> {
            IndexMap::from([(format!("{field_name}-red"), "Red".to_string())])
        }
    }

    fn entry() -> SiteConfigDef {
        SiteConfigDef::new("footer", "Footer", Storage::Config)
            .field("copyright", FieldDef::text().with_label("Copyright").required())
            .field("theme", FieldDef::select([("dark", "Dark"), ("light", "Light")]))
            .field("accent", FieldDef::plain(SELECT_WIDGET))
            .field("hero", FieldDef::reference("media"))
            .field("fancy", FieldDef::plain("color_picker"))
            .field(
                "links",
                FieldDef::multivalue([
                    ("title", FieldDef::text().with_label("Title")),
                    ("target", FieldDef::reference("node")),
                ]),
            )
    }

    #[test]
    fn entry_without_fields_has_no_form() {
        let widgets = WidgetSet::default();
        let def = SiteConfigDef::new("empty", "Empty", Storage::State);
        assert!(FormSchemaBuilder::new(&widgets)
            .build(&def, &ResolvedValues::new())
            .is_none());
    }

    #[test]
    fn builds_collapsed_group_in_declared_order() {
        let widgets = WidgetSet::default();
        let mut values = ResolvedValues::new();
        values.insert("copyright".into(), json!("© 2024").into());

        let form = FormSchemaBuilder::new(&widgets).build(&entry(), &values).unwrap();
        assert_eq!(form.title, "Footer");
        assert_eq!(form.widget, "details");
        assert!(!form.open);
        let names: Vec<_> = form.elements.keys().map(String::as_str).collect();
        assert_eq!(names, ["copyright", "theme", "accent", "hero", "fancy", "links"]);

        let copyright = &form.elements["copyright"];
        assert_eq!(copyright.title, "Copyright");
        assert!(copyright.required);
        assert_eq!(copyright.default_value, ResolvedValue::Raw(json!("© 2024")));
    }

    #[test]
    fn select_gets_empty_option_and_options() {
        let widgets = WidgetSet::default();
        let form = FormSchemaBuilder::new(&widgets)
            .with_options(Some(&Colors))
            .build(&entry(), &ResolvedValues::new())
            .unwrap();

        let theme = &form.elements["theme"];
        assert_eq!(theme.empty_option.as_deref(), Some("- Select -"));
        let keys: Vec<_> = theme.options.as_ref().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["dark", "light"]);

        let accent = &form.elements["accent"];
        assert_eq!(
            accent.options.as_ref().unwrap().get("accent-red").map(String::as_str),
            Some("Red")
        );
    }

    #[test]
    fn reference_keeps_live_entity_default() {
        let widgets = WidgetSet::default();
        let mut values = ResolvedValues::new();
        values.insert(
            "hero".into(),
            Entity::new("media", "image", "m-1", 5).with_url("/media/5").into(),
        );

        let form = FormSchemaBuilder::new(&widgets).build(&entry(), &values).unwrap();
        let hero = &form.elements["hero"];
        assert_eq!(hero.widget, "entity_autocomplete");
        assert_eq!(hero.target_type.as_deref(), Some("media"));
        assert_eq!(hero.default_value.as_entity().unwrap().uuid, "m-1");
        assert_eq!(hero.title, "");
    }

    #[test]
    fn reference_without_autocomplete_widget_is_a_textfield() {
        let widgets = WidgetSet::new([DEFAULT_WIDGET, SELECT_WIDGET, MULTIVALUE_WIDGET]);
        let form = FormSchemaBuilder::new(&widgets)
            .build(&entry(), &ResolvedValues::new())
            .unwrap();
        let hero = &form.elements["hero"];
        assert_eq!(hero.widget, "textfield");
        assert!(hero.target_type.is_none());
        assert!(hero.selection_settings.is_none());
        assert!(form.elements["links"].children["target"].target_type.is_none());
    }

    #[test]
    fn unknown_widget_falls_back_to_textfield() {
        let widgets = WidgetSet::default();
        let form = FormSchemaBuilder::new(&widgets)
            .build(&entry(), &ResolvedValues::new())
            .unwrap();
        assert_eq!(form.elements["fancy"].widget, "textfield");
    }

    #[test]
    fn multivalue_recurses_and_defaults_to_empty_list() {
        let widgets = WidgetSet::default();
        let form = FormSchemaBuilder::new(&widgets)
            .build(&entry(), &ResolvedValues::new())
            .unwrap();
        let links = &form.elements["links"];
        assert_eq!(links.widget, "multivalue");
        assert_eq!(links.default_value, ResolvedValue::List(Vec::new()));
        let children: Vec<_> = links.children.keys().map(String::as_str).collect();
        assert_eq!(children, ["title", "target"]);
        assert_eq!(links.children["target"].target_type.as_deref(), Some("node"));
    }

    #[test]
    fn multivalue_dropped_without_composite_widget() {
        let widgets = WidgetSet::core();
        let form = FormSchemaBuilder::new(&widgets)
            .build(&entry(), &ResolvedValues::new())
            .unwrap();
        assert!(!form.elements.contains_key("links"));
        assert_eq!(form.elements.len(), 5);
    }

    #[test]
    fn view_normalizes_entity_defaults() {
        let widgets = WidgetSet::default();
        let mut values = ResolvedValues::new();
        values.insert(
            "hero".into(),
            Entity::new("media", "image", "m-1", 5).with_url("/media/5").into(),
        );
        let form = FormSchemaBuilder::new(&widgets).build(&entry(), &values).unwrap();
        let view = serde_json::to_value(FormView::from(&form)).unwrap();
        assert_eq!(view["type"], json!("details"));
        assert_eq!(view["elements"]["hero"]["default_value"]["id"], json!("m-1"));
        assert_eq!(view["elements"]["theme"]["empty_option"], json!("- Select -"));
    }
}
