//! Request spans.
//!
//! Every request gets one span carrying its method, path and request ID, so
//! guard decisions logged further down can be correlated.

use axum::extract::Request;
use tracing::Span;

use crate::http::request::X_REQUEST_ID;

pub fn make_request_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}
