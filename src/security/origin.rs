//! Origin allow-list (CORS).
//!
//! Disallowed origins are not refused; their responses simply carry no
//! `Access-Control-Allow-*` headers, so the browser withholds the body.

use axum::http::{request::Parts, HeaderValue, Method};
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;
use crate::observability::metrics;

/// Set of origins allowed to read cross-origin responses.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowList {
    origins: HashSet<HeaderValue>,
}

impl OriginAllowList {
    pub fn from_config(config: &CorsConfig) -> Self {
        let origins = config
            .origins()
            .into_iter()
            .filter_map(|origin| match HeaderValue::from_str(&origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring unusable allowed origin");
                    None
                }
            })
            .collect();
        Self { origins }
    }

    pub fn is_allowed(&self, origin: &HeaderValue) -> bool {
        self.origins.contains(origin)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

/// Build the CORS layer enforcing `allow_list`.
pub fn cors_layer(allow_list: OriginAllowList) -> CorsLayer {
    let allow_list = Arc::new(allow_list);

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, parts: &Parts| {
                let allowed = allow_list.is_allowed(origin);
                if !allowed {
                    tracing::debug!(
                        origin = ?origin,
                        path = %parts.uri.path(),
                        "Origin not in allow-list, omitting CORS headers"
                    );
                    metrics::record_origin_rejected();
                }
                allowed
            },
        ))
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_matches_exactly() {
        let list = OriginAllowList::from_config(&CorsConfig {
            allowed_origin: "https://app.example.com,http://localhost:5173".into(),
        });
        assert_eq!(list.len(), 2);
        assert!(list.is_allowed(&HeaderValue::from_static("https://app.example.com")));
        assert!(list.is_allowed(&HeaderValue::from_static("http://localhost:5173")));
        assert!(!list.is_allowed(&HeaderValue::from_static("https://app.example.com.evil.io")));
        assert!(!list.is_allowed(&HeaderValue::from_static("http://app.example.com")));
        assert!(!list.is_allowed(&HeaderValue::from_static("null")));
    }

    #[test]
    fn test_empty_list_allows_nothing() {
        let list = OriginAllowList::from_config(&CorsConfig::default());
        assert!(list.is_empty());
        assert!(!list.is_allowed(&HeaderValue::from_static("https://app.example.com")));
    }
}
