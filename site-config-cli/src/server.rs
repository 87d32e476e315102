//! HTTP read surfaces for site config values.
//!
//! | Route | Body |
//! |---|---|
//! | `GET /jsonapi/site_config` | JSON:API collection of `site_config--item` |
//! | `GET /jsonapi/site_config/:id` | JSON:API document for one entry |
//! | `GET /api/site-config` | `{<entry id>: <values>}` |
//! | `GET /api/site-config/:id` | values of one entry |
//! | `GET /health` | `OK` |
//!
//! The language of a request comes from `?lang=`, then the first
//! `Accept-Language` tag, then the configured default.

use axum::extract::{Path, Query, State};
use axum::http::header::{ACCEPT_LANGUAGE, CONTENT_LANGUAGE, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use site_config::{is_valid_langcode, resource, CacheableResponse, SiteConfigService};
use tokio::net::TcpListener;
use tracing::{debug, info};

pub const JSONAPI_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Space-separated cache tags of the response.
pub const CACHE_TAGS_HEADER: &str = "x-cache-tags";

/// Space-separated cache contexts of the response.
pub const CACHE_CONTEXTS_HEADER: &str = "x-cache-contexts";

#[derive(Debug, Default, Deserialize)]
pub struct LanguageQuery {
    lang: Option<String>,
}

/// Build the router serving both read surfaces.
pub fn router(service: SiteConfigService) -> Router {
    Router::new()
        .route("/jsonapi/site_config", get(jsonapi_list))
        .route("/jsonapi/site_config/:id", get(jsonapi_item))
        .route("/api/site-config", get(rest_list))
        .route("/api/site-config/:id", get(rest_item))
        .route("/health", get(health_check))
        .with_state(service)
}

/// Listen on `bind` until Ctrl+C.
pub async fn serve(service: SiteConfigService, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(address = %listener.local_addr()?, "site config server listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("site config server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

/// The service answering in the language `query` and `headers` ask for.
fn request_service(
    service: &SiteConfigService,
    query: &LanguageQuery,
    headers: &HeaderMap,
) -> SiteConfigService {
    let requested = query
        .lang
        .as_deref()
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_ascii_lowercase)
        .filter(|lang| {
            let valid = is_valid_langcode(lang);
            if !valid {
                debug!(%lang, "ignoring invalid language code");
            }
            valid
        })
        .or_else(|| accept_language(headers));

    match requested {
        Some(lang) if lang != service.langcode() => {
            debug!(%lang, "serving request language");
            service.with_language(&lang)
        }
        _ => service.clone(),
    }
}

/// Primary subtag of the first `Accept-Language` entry, ignoring `*`.
fn accept_language(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(ACCEPT_LANGUAGE)?.to_str().ok()?;
    let first = header.split(',').next()?.split(';').next()?.trim();
    let primary = first.split('-').next()?.trim();
    let primary = primary.to_ascii_lowercase();
    is_valid_langcode(&primary).then_some(primary)
}

fn cacheable(response: CacheableResponse, content_type: &'static str) -> Response {
    let tags = response.cache.tags().collect::<Vec<_>>().join(" ");
    let contexts = response.cache.contexts().collect::<Vec<_>>().join(" ");

    let mut http = Json(response.body).into_response();
    let headers = http.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&tags) {
        headers.insert(CACHE_TAGS_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&contexts) {
        headers.insert(CACHE_CONTEXTS_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&response.langcode) {
        headers.insert(CONTENT_LANGUAGE, value);
    }
    http
}

async fn jsonapi_list(
    State(service): State<SiteConfigService>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
) -> Response {
    let service = request_service(&service, &query, &headers);
    cacheable(resource::jsonapi_list(&service), JSONAPI_CONTENT_TYPE)
}

async fn jsonapi_item(
    State(service): State<SiteConfigService>,
    Path(id): Path<String>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
) -> Response {
    let service = request_service(&service, &query, &headers);
    cacheable(resource::jsonapi_item(&service, &id), JSONAPI_CONTENT_TYPE)
}

async fn rest_list(
    State(service): State<SiteConfigService>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
) -> Response {
    let service = request_service(&service, &query, &headers);
    cacheable(resource::rest_list(&service), "application/json")
}

async fn rest_item(
    State(service): State<SiteConfigService>,
    Path(id): Path<String>,
    Query(query): Query<LanguageQuery>,
    headers: HeaderMap,
) -> Response {
    let service = request_service(&service, &query, &headers);
    cacheable(resource::rest_item(&service, &id), "application/json")
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_language_takes_first_primary_subtag() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("fr-CA,fr;q=0.9,en;q=0.8"));
        assert_eq!(accept_language(&headers).as_deref(), Some("fr"));
    }

    #[test]
    fn accept_language_wildcard_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("*"));
        assert_eq!(accept_language(&headers), None);
        assert_eq!(accept_language(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn health() {
        assert_eq!(health_check().await, "OK");
    }
}
