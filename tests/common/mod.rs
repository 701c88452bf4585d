//! Shared utilities for integration testing.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cookie::Cookie;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

use spa_gateway::config::GatewayConfig;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const ALLOWED_ORIGIN: &str = "https://app.example.com";
pub const CLIENT: &str = "203.0.113.10:51000";
pub const ENTRY: &str = "<!doctype html><html><body><div id=\"root\"></div></body></html>";
pub const APP_JS: &str = "document.getElementById('root').textContent = 'hi';";

/// A built SPA bundle: entry document plus one hashed asset.
pub fn site_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), ENTRY).unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/app.3f9a.js"), APP_JS).unwrap();
    dir
}

pub fn test_config(root: &Path) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.cors.allowed_origin = ALLOWED_ORIGIN.to_string();
    config.csrf.secret = Some(TEST_SECRET.to_string());
    config.assets.root = root.to_path_buf();
    config
}

/// In-process stand-in for the API handler set.
pub fn widgets_api() -> Router {
    Router::new()
        .route(
            "/api/widgets",
            get(|| async { Json(json!({ "widgets": ["gear", "sprocket"] })) }).post(
                |body: Bytes| async move {
                    let received = String::from_utf8_lossy(&body).into_owned();
                    (StatusCode::CREATED, Json(json!({ "created": received })))
                },
            ),
        )
        .fallback(|| async {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" })))
        })
}

pub fn with_peer(mut request: Request, peer: &str) -> Request {
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub fn request(method: Method, uri: &str) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn request_with_cookie(method: Method, uri: &str, token: &str) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("csrfToken={token}"))
        .body(Body::empty())
        .unwrap()
}

/// Send `request` through `router` as if it came from [`CLIENT`].
pub async fn call(router: &Router, request: Request) -> Response {
    call_from(router, request, CLIENT).await
}

pub async fn call_from(router: &Router, request: Request, peer: &str) -> Response {
    router
        .clone()
        .oneshot(with_peer(request, peer))
        .await
        .unwrap()
        .into_response()
}

/// Value of the `csrfToken` cookie set by `headers`, if any.
pub fn issued_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v).ok())
        .find(|cookie| cookie.name() == "csrfToken")
        .map(|cookie| cookie.value().to_string())
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Start a mock upstream API that echoes what it received as JSON.
pub async fn start_mock_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(|request: Request| async move {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Json(json!({
            "method": parts.method.as_str(),
            "uri": parts.uri.to_string(),
            "body": String::from_utf8_lossy(&body),
            "cookie": header("cookie"),
            "x_forwarded_for": header("x-forwarded-for"),
        }))
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Upstream that accepts every request and answers only after `delay`.
pub async fn start_slow_backend(delay: std::time::Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        Json(json!({ "late": true }))
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
