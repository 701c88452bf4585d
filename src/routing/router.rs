//! Final pipeline stage: API namespace or static site.
//!
//! # Responsibilities
//! - Send requests under the API prefix to the API handler set
//! - Send everything else to the asset service with its entry-document fallback
//!
//! # Design Decisions
//! - The API handler set sees the original, unstripped path
//! - Immutable after construction (thread-safe without locks)
//! - Never produces a 404 for the site; unmatched paths get the entry document

use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    Router,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::routing::assets::EntryDocument;
use crate::routing::matcher::NamespaceMatcher;

#[derive(Clone)]
pub struct SiteRouter {
    namespace: NamespaceMatcher,
    api: Router,
    assets: ServeDir<EntryDocument>,
}

impl SiteRouter {
    pub fn new(namespace: NamespaceMatcher, api: Router, assets: ServeDir<EntryDocument>) -> Self {
        Self {
            namespace,
            api,
            assets,
        }
    }

    pub fn namespace(&self) -> &NamespaceMatcher {
        &self.namespace
    }

    /// An axum router whose every request goes through [`dispatch`].
    pub fn into_router(self) -> Router {
        Router::new().fallback(dispatch).with_state(self)
    }
}

async fn dispatch(State(site): State<SiteRouter>, request: Request) -> Response {
    let result = if site.namespace.matches(&request) {
        tracing::trace!(path = %request.uri().path(), "Dispatching to API");
        site.api.oneshot(request).await
    } else {
        site.assets
            .oneshot(request)
            .await
            .map(IntoResponse::into_response)
    };

    match result {
        Ok(response) => response,
        Err(never) => match never {},
    }
}
