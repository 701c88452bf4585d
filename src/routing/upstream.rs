//! API handler set implementations.
//!
//! # Responsibilities
//! - Forward API-namespace requests to an upstream service verbatim
//!   (method, headers, path and query, body)
//! - Pass the upstream response back unmodified apart from hop-by-hop headers
//! - Answer 503 when no API backend is configured
//!
//! # Design Decisions
//! - Bodies are streamed, never buffered
//! - Connection failures map to 502, upstream timeouts to 504

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        HeaderValue, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::json;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::http::response::strip_hop_by_hop;
use crate::security::client::X_FORWARDED_FOR;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream URL {0:?}: expected an absolute http:// URL")]
    InvalidUrl(String),
}

/// Forwards requests to an upstream HTTP service.
#[derive(Clone)]
pub struct UpstreamApi {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    base_path: String,
    timeout: Duration,
}

impl UpstreamApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let invalid = || UpstreamError::InvalidUrl(base_url.to_string());

        let url = Url::parse(base_url).map_err(|_| invalid())?;
        if url.scheme() != "http" {
            return Err(invalid());
        }
        let host = url.host_str().ok_or_else(invalid)?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority).map_err(|_| invalid())?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Target URI for a request that arrived as `original`.
    pub fn upstream_uri(&self, original: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = original
            .path_and_query()
            .map(PathAndQuery::as_str)
            .unwrap_or("/");
        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(format!("{}{}", self.base_path, path_and_query))
            .build()
    }

    pub fn into_router(self) -> Router {
        Router::new().fallback(forward).with_state(self)
    }
}

/// API handler set used when no upstream is configured.
pub fn unconfigured_api() -> Router {
    Router::new().fallback(|| async {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "api_unavailable",
            "No API backend is configured",
        )
    })
}

fn api_error(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (status, Json(json!({ "error": code, "message": message }))).into_response()
}

async fn forward(State(upstream): State<UpstreamApi>, request: Request) -> Response {
    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    parts.uri = match upstream.upstream_uri(&parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Could not build upstream URI");
            return api_error(StatusCode::BAD_GATEWAY, "bad_gateway", "Upstream request failed");
        }
    };
    // The pooled client speaks HTTP/1.1 to the upstream regardless of the inbound version.
    parts.version = Version::HTTP_11;
    strip_hop_by_hop(&mut parts.headers);

    if let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>().copied() {
        let chain = match parts
            .headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
        {
            Some(existing) => format!("{existing}, {}", peer.ip()),
            None => peer.ip().to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            parts.headers.insert(X_FORWARDED_FOR, value);
        }
    }

    let method = parts.method.clone();
    let request = Request::from_parts(parts, body);

    match tokio::time::timeout(upstream.timeout, upstream.client.request(request)).await {
        Ok(Ok(response)) => {
            tracing::debug!(method = %method, path = %path, status = %response.status(), "Upstream responded");
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(e)) => {
            tracing::error!(method = %method, path = %path, error = %e, "Upstream error");
            api_error(StatusCode::BAD_GATEWAY, "bad_gateway", "Upstream request failed")
        }
        Err(_) => {
            tracing::error!(
                method = %method,
                path = %path,
                timeout_secs = upstream.timeout.as_secs(),
                "Upstream timed out"
            );
            api_error(StatusCode::GATEWAY_TIMEOUT, "gateway_timeout", "Upstream timed out")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_uri_keeps_path_and_query() {
        let api = UpstreamApi::new("http://127.0.0.1:4000", Duration::from_secs(5)).unwrap();
        let uri = api
            .upstream_uri(&"/api/widgets?page=2".parse().unwrap())
            .unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:4000/api/widgets?page=2");
    }

    #[test]
    fn test_upstream_base_path_is_prepended() {
        let api = UpstreamApi::new("http://backend.internal/v1/", Duration::from_secs(5)).unwrap();
        let uri = api.upstream_uri(&"/api/widgets".parse().unwrap()).unwrap();
        assert_eq!(uri.to_string(), "http://backend.internal/v1/api/widgets");
    }

    #[test]
    fn test_rejects_non_http_upstreams() {
        for url in ["https://backend.internal", "backend.internal:4000", "unix:/tmp/api.sock"] {
            assert!(UpstreamApi::new(url, Duration::from_secs(5)).is_err(), "{url}");
        }
    }
}
