//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, ceiling > 0)
//! - Check that origins and the upstream URL are well formed
//! - Check that the asset root, entry document and TLS files exist
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderValue;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("csrf.secret is not set (CSRF_SECRET)")]
    MissingSecret,

    #[error("rate_limit.window_ms must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroMaxRequests,

    #[error("rate_limit.stale_after_windows must be greater than zero")]
    ZeroStaleWindows,

    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("invalid allowed origin {0:?}: expected scheme://host[:port]")]
    InvalidOrigin(String),

    #[error("invalid api.upstream {0:?}: expected an absolute http:// URL")]
    InvalidUpstream(String),

    #[error("api.prefix {0:?} must start with '/' and not end with '/'")]
    InvalidApiPrefix(String),

    #[error("headers.content_security_policy is not a valid header value")]
    InvalidContentSecurityPolicy,

    #[error("asset root {0:?} is not a directory")]
    AssetRootMissing(PathBuf),

    #[error("entry document {0:?} not found")]
    EntryDocumentMissing(PathBuf),

    #[error("TLS file {0:?} not found")]
    TlsFileMissing(PathBuf),
}

/// Run every semantic check against `config`.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.csrf.secret.as_deref().map_or(true, str::is_empty) {
        errors.push(ValidationError::MissingSecret);
    }

    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroMaxRequests);
    }
    if config.rate_limit.stale_after_windows == 0 {
        errors.push(ValidationError::ZeroStaleWindows);
    }

    if config.listener.socket_addr().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address(),
        ));
    }

    for origin in config.cors.origins() {
        if !is_valid_origin(&origin) {
            errors.push(ValidationError::InvalidOrigin(origin));
        }
    }

    if let Some(upstream) = &config.api.upstream {
        if !is_valid_upstream(upstream) {
            errors.push(ValidationError::InvalidUpstream(upstream.clone()));
        }
    }

    let prefix = &config.api.prefix;
    if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
        errors.push(ValidationError::InvalidApiPrefix(prefix.clone()));
    }

    if HeaderValue::from_str(&config.headers.content_security_policy).is_err() {
        errors.push(ValidationError::InvalidContentSecurityPolicy);
    }

    if !config.assets.root.is_dir() {
        errors.push(ValidationError::AssetRootMissing(config.assets.root.clone()));
    } else if !config.assets.entry_path().is_file() {
        errors.push(ValidationError::EntryDocumentMissing(
            config.assets.entry_path(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        for path in [&tls.cert_path, &tls.key_path] {
            if !path.is_file() {
                errors.push(ValidationError::TlsFileMissing(path.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An origin is exactly `scheme://host[:port]` in its serialized form.
fn is_valid_origin(origin: &str) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    matches!(url.scheme(), "http" | "https")
        && url.host().is_some()
        && url.origin().ascii_serialization() == origin
}

fn is_valid_upstream(upstream: &str) -> bool {
    Url::parse(upstream)
        .map(|url| url.scheme() == "http" && url.host().is_some())
        .unwrap_or(false)
}
