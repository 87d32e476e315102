//! Maintenance subcommands. Each returns the text to print.

use anyhow::{bail, Context};
use serde_json::Value;
use site_config::{FormView, SiteConfigService};
use tracing::info;

/// Every entry's normalized values.
pub fn list(service: &SiteConfigService) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&service.get_site_config())?)
}

/// One entry, or one field of it.
pub fn get(
    service: &SiteConfigService,
    entry: &str,
    field: Option<&str>,
) -> anyhow::Result<String> {
    ensure_entry(service, entry)?;
    let value = match field {
        Some(field) => {
            ensure_field(service, entry, field)?;
            service.get_value(entry, field, None)
        }
        None => Value::Object(service.get_site_config_by_id(entry)),
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Store `raw`, parsed as JSON when possible.
pub fn set(
    service: &SiteConfigService,
    entry: &str,
    field: &str,
    raw: &str,
) -> anyhow::Result<String> {
    ensure_field(service, entry, field)?;
    let value = parse_value(raw);
    service
        .set_value(entry, field, value.clone())
        .with_context(|| format!("failed to store {entry}.{field}"))?;
    info!(entry, field, lang = service.langcode(), "value stored");
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Settings form schema of one entry, or all of them.
pub fn form(service: &SiteConfigService, entry: Option<&str>) -> anyhow::Result<String> {
    let forms = match entry {
        Some(entry) => {
            ensure_entry(service, entry)?;
            service.build_form_schema(entry).into_iter().collect()
        }
        None => service.build_settings_form(),
    };
    let views: Vec<FormView> = forms.iter().map(FormView::from).collect();
    Ok(serde_json::to_string_pretty(&views)?)
}

fn ensure_entry(service: &SiteConfigService, entry: &str) -> anyhow::Result<()> {
    if !service.registry().has_definition(entry) {
        bail!("unknown site config entry '{entry}'");
    }
    Ok(())
}

fn ensure_field(service: &SiteConfigService, entry: &str, field: &str) -> anyhow::Result<()> {
    ensure_entry(service, entry)?;
    let def = service.registry().get_definition(entry);
    if def.and_then(|def| def.get_field(field)).is_none() {
        bail!("entry '{entry}' has no field '{field}'");
    }
    Ok(())
}

/// JSON when it parses, otherwise the text itself.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use site_config_fields::{FieldDef, SiteConfigDef, SiteConfigRegistry, Storage};
    use std::sync::Arc;

    fn service() -> SiteConfigService {
        let registry = SiteConfigRegistry::from_definitions([SiteConfigDef::new(
            "footer",
            "Footer",
            Storage::Config,
        )
        .field("copyright", FieldDef::text().with_label("Copyright"))
        .field("year", FieldDef::plain("number"))]);
        SiteConfigService::builder(Arc::new(registry)).build()
    }

    #[test]
    fn parse_value_prefers_json() {
        assert_eq!(parse_value("2024"), json!(2024));
        assert_eq!(parse_value(r#"["a"]"#), json!(["a"]));
        assert_eq!(parse_value("© 2024"), json!("© 2024"));
    }

    #[test]
    fn set_then_get() {
        let service = service();
        set(&service, "footer", "year", "2024").unwrap();
        set(&service, "footer", "copyright", "ACME").unwrap();

        let field = get(&service, "footer", Some("year")).unwrap();
        let field: Value = serde_json::from_str(&field).unwrap();
        assert_eq!(field, json!(2024));

        let entry: Value = serde_json::from_str(&get(&service, "footer", None).unwrap()).unwrap();
        assert_eq!(entry, json!({"copyright": "ACME", "year": 2024}));
    }

    #[test]
    fn unknown_entry_and_field_are_errors() {
        let service = service();
        assert!(get(&service, "nope", None).is_err());
        assert!(get(&service, "footer", Some("nope")).is_err());
        assert!(set(&service, "nope", "x", "1").is_err());
    }

    #[test]
    fn set_rejects_undeclared_field() {
        let service = service();
        let err = set(&service, "footer", "tagline", "hello").unwrap_err();
        assert!(err.to_string().contains("no field 'tagline'"));
        assert_eq!(service.get_value("footer", "tagline", None), Value::Null);
    }

    #[test]
    fn list_and_form_render_json() {
        let service = service();
        let all: Value = serde_json::from_str(&list(&service).unwrap()).unwrap();
        assert_eq!(all, json!({"footer": {"copyright": null, "year": null}}));

        let forms: Value = serde_json::from_str(&form(&service, Some("footer")).unwrap()).unwrap();
        assert_eq!(forms[0]["elements"]["copyright"]["title"], json!("Copyright"));
        assert_eq!(forms[0]["elements"]["year"]["type"], json!("number"));
    }
}
