//! Route matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A namespace matches on whole segments: `/api` and `/api/x` match,
//!   `/apis` does not
//! - No regex to guarantee O(n) matching

use axum::http::Request;

/// Matches requests inside a path namespace such as `/api`.
#[derive(Debug, Clone)]
pub struct NamespaceMatcher {
    prefix: String,
}

impl NamespaceMatcher {
    /// Create a new namespace matcher. Trailing slashes are ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches_path(&self, path: &str) -> bool {
        path.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Returns true if the request path lies in this namespace.
    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        self.matches_path(req.uri().path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_namespace_matcher() {
        let matcher = NamespaceMatcher::new("/api");

        assert!(matcher.matches_path("/api"));
        assert!(matcher.matches_path("/api/"));
        assert!(matcher.matches_path("/api/widgets/7"));
        assert!(!matcher.matches_path("/apis"));
        assert!(!matcher.matches_path("/API/widgets"));
        assert!(!matcher.matches_path("/"));
        assert!(!matcher.matches_path("/app/api"));
    }

    #[test]
    fn test_query_is_ignored() {
        let matcher = NamespaceMatcher::new("/api/");
        assert_eq!(matcher.prefix(), "/api");

        let req = Request::builder()
            .uri("/api?page=2")
            .body(Body::default())
            .unwrap();
        assert!(matcher.matches(&req));
    }
}
