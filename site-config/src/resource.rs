//! Response documents for the two read surfaces.
//!
//! Both are thin layers over [`SiteConfigService`]: the JSON:API flavour wraps
//! each entry in a `site_config--item` resource object, the REST flavour
//! returns the normalized values as they are.

use serde_json::{json, Map, Value};

use crate::cache::CacheableMetadata;
use crate::service::SiteConfigService;

/// JSON:API resource type of a site config entry.
pub const RESOURCE_TYPE: &str = "site_config--item";

pub const JSONAPI_VERSION: &str = "1.0";

/// A response body with the cache metadata and language it was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheableResponse {
    pub body: Value,
    pub cache: CacheableMetadata,
    pub langcode: String,
}

impl CacheableResponse {
    fn new(service: &SiteConfigService, body: Value) -> Self {
        Self {
            body,
            cache: CacheableMetadata::site_config(),
            langcode: service.langcode().to_string(),
        }
    }
}

fn resource_object(id: &str, attributes: Map<String, Value>) -> Value {
    json!({
        "type": RESOURCE_TYPE,
        "id": id,
        "attributes": attributes,
        "links": {},
    })
}

fn document(data: Value) -> Value {
    json!({
        "jsonapi": {"version": JSONAPI_VERSION},
        "data": data,
        "links": {},
    })
}

/// JSON:API collection of every entry.
pub fn jsonapi_list(service: &SiteConfigService) -> CacheableResponse {
    let data = service
        .get_site_config()
        .into_iter()
        .map(|(id, attributes)| resource_object(&id, attributes))
        .collect();
    CacheableResponse::new(service, document(Value::Array(data)))
}

/// JSON:API document for entry `id`; `data` is null when there is nothing to show.
pub fn jsonapi_item(service: &SiteConfigService, id: &str) -> CacheableResponse {
    let attributes = service.get_site_config_by_id(id);
    let data = if attributes.is_empty() {
        Value::Null
    } else {
        resource_object(id, attributes)
    };
    CacheableResponse::new(service, document(data))
}

/// `{<entry id>: <values>}` for every entry.
pub fn rest_list(service: &SiteConfigService) -> CacheableResponse {
    let body = service
        .get_site_config()
        .into_iter()
        .map(|(id, values)| (id, Value::Object(values)))
        .collect::<Map<_, _>>();
    CacheableResponse::new(service, Value::Object(body))
}

/// Values of entry `id`, empty for an unknown id.
pub fn rest_item(service: &SiteConfigService, id: &str) -> CacheableResponse {
    let body = Value::Object(service.get_site_config_by_id(id));
    CacheableResponse::new(service, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use site_config_fields::{FieldDef, SiteConfigDef, SiteConfigRegistry, Storage};

    fn service() -> SiteConfigService {
        let registry = SiteConfigRegistry::from_definitions([
            SiteConfigDef::new("footer", "Footer", Storage::Config)
                .field("copyright", FieldDef::text()),
            SiteConfigDef::new("empty", "Empty", Storage::State),
        ]);
        let service = SiteConfigService::builder(Arc::new(registry)).build();
        service
            .set_value("footer", "copyright", json!("© 2024"))
            .unwrap();
        service
    }

    #[test]
    fn jsonapi_list_wraps_entries() {
        let response = jsonapi_list(&service());
        assert_eq!(response.body["jsonapi"]["version"], json!("1.0"));
        assert_eq!(
            response.body["data"],
            json!([
                {"type": "site_config--item", "id": "empty", "attributes": {}, "links": {}},
                {
                    "type": "site_config--item",
                    "id": "footer",
                    "attributes": {"copyright": "© 2024"},
                    "links": {}
                },
            ])
        );
        assert_eq!(response.cache, CacheableMetadata::site_config());
        assert_eq!(response.langcode, "en");
    }

    #[test]
    fn jsonapi_item_is_null_for_unknown_or_empty() {
        let service = service();
        assert_eq!(jsonapi_item(&service, "missing").body["data"], Value::Null);
        assert_eq!(jsonapi_item(&service, "empty").body["data"], Value::Null);
        assert_eq!(
            jsonapi_item(&service, "footer").body["data"]["attributes"],
            json!({"copyright": "© 2024"})
        );
    }

    #[test]
    fn rest_resources() {
        let service = service();
        assert_eq!(
            rest_list(&service).body,
            json!({"empty": {}, "footer": {"copyright": "© 2024"}})
        );
        assert_eq!(rest_item(&service, "footer").body, json!({"copyright": "© 2024"}));
        assert_eq!(rest_item(&service, "missing").body, json!({}));
    }
}
