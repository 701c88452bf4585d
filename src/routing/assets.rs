//! Static assets and the single-page entry document.
//!
//! # Responsibilities
//! - Serve files under the asset root
//! - Answer every unmatched path with the entry document (200) so the
//!   client-side router can take over
//!
//! # Design Decisions
//! - The entry document is read once at startup; a missing file is a
//!   configuration error, never a per-request failure
//! - Path traversal protection and content types come from `ServeDir`

use axum::{
    body::Bytes,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::future::{ready, Ready};
use std::path::Path;
use std::task::{Context, Poll};
use tower::Service;
use tower_http::services::ServeDir;

/// The SPA's entry HTML, held in memory.
#[derive(Debug, Clone)]
pub struct EntryDocument {
    body: Bytes,
}

impl EntryDocument {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let body = std::fs::read(path)?;
        Ok(Self::from_bytes(body))
    }

    pub fn from_bytes(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }

    pub fn response(&self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            self.body.clone(),
        )
            .into_response()
    }
}

impl<B> Service<Request<B>> for EntryDocument {
    type Response = Response;
    type Error = Infallible;
    type Future = Ready<Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: Request<B>) -> Self::Future {
        ready(Ok(self.response()))
    }
}

/// Files under `root`, falling back to `entry` for anything unmatched,
/// whatever the method.
pub fn asset_service(root: &Path, entry: EntryDocument) -> ServeDir<EntryDocument> {
    ServeDir::new(root)
        .fallback(entry)
        .call_fallback_on_method_not_allowed(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    const ENTRY: &str = "<!doctype html><div id=\"app\"></div>";

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), ENTRY).unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
        dir
    }

    async fn fetch(root: &Path, method: Method, uri: &str) -> (StatusCode, String, Bytes) {
        let entry = EntryDocument::load(&root.join("index.html")).unwrap();
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = asset_service(root, entry)
            .oneshot(request)
            .await
            .unwrap()
            .into_response();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, body)
    }

    #[tokio::test]
    async fn test_existing_asset_served() {
        let dir = site();
        let (status, content_type, body) = fetch(dir.path(), Method::GET, "/assets/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.contains("javascript"));
        assert_eq!(&body[..], b"console.log(1)");
    }

    #[tokio::test]
    async fn test_unmatched_path_gets_entry_document() {
        let dir = site();
        for uri in ["/dashboard/settings", "/assets/missing.css", "/../../etc/passwd"] {
            let (status, content_type, body) = fetch(dir.path(), Method::GET, uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert!(content_type.starts_with("text/html"));
            assert_eq!(&body[..], ENTRY.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_entry_document_for_any_method() {
        let dir = site();
        let (status, _, body) = fetch(dir.path(), Method::POST, "/checkout").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], ENTRY.as_bytes());
    }

    #[test]
    fn test_missing_entry_document_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EntryDocument::load(&dir.path().join("index.html")).is_err());
    }
}
