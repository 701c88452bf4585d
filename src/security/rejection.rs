//! Terminal rejections produced by pipeline stages.

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// A request stopped by one of the protective stages.
///
/// Each variant maps to exactly one client-facing status and a stable
/// machine-readable `error` code in the JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Too many requests, retry in {}s", whole_secs(*.retry_after))]
    RateLimitExceeded { retry_after: Duration, limit: u32 },

    #[error("Missing CSRF token")]
    CsrfMissing,

    #[error("Invalid CSRF token")]
    CsrfInvalid,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Rejection::CsrfMissing | Rejection::CsrfInvalid => StatusCode::FORBIDDEN,
        }
    }

    /// Stable reason code, also used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Rejection::CsrfMissing => "csrf_missing",
            Rejection::CsrfInvalid => "csrf_invalid",
        }
    }
}

/// Seconds rounded up, so a client never retries early.
pub(crate) fn whole_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        let mut response = (self.status(), body).into_response();

        if let Rejection::RateLimitExceeded { retry_after, limit } = self {
            let headers = response.headers_mut();
            let reset = HeaderValue::from(whole_secs(retry_after));
            headers.insert(header::RETRY_AFTER, reset.clone());
            headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(RATELIMIT_REMAINING, HeaderValue::from(0u32));
            headers.insert(RATELIMIT_RESET, reset);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_codes() {
        assert_eq!(Rejection::CsrfMissing.status(), StatusCode::FORBIDDEN);
        assert_eq!(Rejection::CsrfInvalid.status(), StatusCode::FORBIDDEN);
        assert_ne!(Rejection::CsrfMissing.code(), Rejection::CsrfInvalid.code());

        let limited = Rejection::RateLimitExceeded {
            retry_after: Duration::from_secs(3),
            limit: 10,
        };
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.code(), "rate_limit_exceeded");
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(whole_secs(Duration::from_millis(1)), 1);
        assert_eq!(whole_secs(Duration::from_millis(2_000)), 2);
        assert_eq!(whole_secs(Duration::from_millis(2_001)), 3);
        assert_eq!(whole_secs(Duration::ZERO), 0);
    }

    #[test]
    fn test_rate_limit_response_carries_hint() {
        let response = Rejection::RateLimitExceeded {
            retry_after: Duration::from_millis(1_500),
            limit: 100,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
        assert_eq!(response.headers()[RATELIMIT_LIMIT], "100");
        assert_eq!(response.headers()[RATELIMIT_REMAINING], "0");
    }
}
