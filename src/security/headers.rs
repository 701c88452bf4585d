//! Hardening response headers.
//!
//! # Responsibilities
//! - Add a fixed set of security headers to every response
//! - Add Strict-Transport-Security only when clients reach us over HTTPS
//! - Remove `X-Powered-By` if a downstream handler set it
//!
//! # Design Decisions
//! - The header set is computed once at startup; the middleware only copies it
//! - Headers overwrite whatever the inner handlers produced

use axum::{
    extract::{Request, State},
    http::{
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
            X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS, X_XSS_PROTECTION,
        },
        header::InvalidHeaderValue,
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::HeaderConfig;

const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// The precomputed header set applied to every response.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderPolicy {
    pub fn from_config(
        config: &HeaderConfig,
        https_active: bool,
    ) -> Result<Self, InvalidHeaderValue> {
        let mut headers = vec![
            (
                CONTENT_SECURITY_POLICY,
                HeaderValue::from_str(&config.content_security_policy)?,
            ),
            (
                HeaderName::from_static("cross-origin-opener-policy"),
                HeaderValue::from_static("same-origin"),
            ),
            (
                HeaderName::from_static("cross-origin-resource-policy"),
                HeaderValue::from_static("same-origin"),
            ),
            (
                HeaderName::from_static("origin-agent-cluster"),
                HeaderValue::from_static("?1"),
            ),
            (REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
            (
                HeaderName::from_static("x-download-options"),
                HeaderValue::from_static("noopen"),
            ),
            (X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
            (
                HeaderName::from_static("x-permitted-cross-domain-policies"),
                HeaderValue::from_static("none"),
            ),
            (X_XSS_PROTECTION, HeaderValue::from_static("0")),
        ];

        if https_active {
            headers.push((
                STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_str(&format!(
                    "max-age={}; includeSubDomains",
                    config.hsts_max_age_secs
                ))?,
            ));
        }

        Ok(Self { headers })
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.remove(X_POWERED_BY);
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }
}

/// Add the hardening headers to all responses.
pub async fn security_headers_middleware(
    State(policy): State<Arc<HeaderPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    policy.apply(response.headers_mut());
    response
}
