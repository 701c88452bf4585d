//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Origin allow-list.
    pub cors: CorsConfig,

    /// Per-client request rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Anti-forgery token settings.
    pub csrf: CsrfConfig,

    /// Hardening response headers.
    pub headers: HeaderConfig,

    /// Static asset root and SPA entry document.
    pub assets: AssetConfig,

    /// API namespace and upstream.
    pub api: ApiConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// True when clients reach us over HTTPS, either directly or through a
    /// TLS-terminating proxy announced via `secure_cookies`.
    pub fn https_active(&self) -> bool {
        self.listener.tls.is_some() || self.csrf.secure_cookies
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port.
    pub port: u16,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl ListenerConfig {
    /// Combined `host:port` string.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_address().parse()
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Origin allow-list configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Permitted origin, or a comma-separated list of them.
    pub allowed_origin: String,
}

impl CorsConfig {
    /// Individual origins from `allowed_origin`, trimmed, empties dropped.
    pub fn origins(&self) -> Vec<String> {
        self.allowed_origin
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .collect()
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Requests admitted per client per window.
    pub max_requests: u32,

    /// Give back the unit consumed by responses with status below 400.
    pub skip_successful: bool,

    /// Key clients by the left-most `X-Forwarded-For` address.
    /// Only enable behind a proxy that overwrites this header.
    pub trust_forwarded_for: bool,

    /// Counters idle for this many windows are evicted.
    pub stale_after_windows: u32,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 15 * 60 * 1000,
            max_requests: 100,
            skip_successful: false,
            trust_forwarded_for: false,
            stale_after_windows: 2,
        }
    }
}

/// CSRF token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Signing secret. Required; startup fails without it.
    pub secret: Option<String>,

    /// Mark the token cookie `Secure`.
    pub secure_cookies: bool,

    /// Cookie carrying the token.
    pub cookie_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            secret: None,
            secure_cookies: false,
            cookie_name: "csrfToken".to_string(),
        }
    }
}

/// Hardening header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Value of `Content-Security-Policy`.
    pub content_security_policy: String,

    /// `max-age` of `Strict-Transport-Security`, sent only over HTTPS.
    pub hsts_max_age_secs: u64,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            content_security_policy: DEFAULT_CSP.to_string(),
            hsts_max_age_secs: 365 * 24 * 60 * 60,
        }
    }
}

pub const DEFAULT_CSP: &str = "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';\
script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline';\
upgrade-insecure-requests";

/// Static asset configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding the built SPA bundle.
    pub root: PathBuf,

    /// Entry document, relative to `root`.
    pub entry_document: PathBuf,
}

impl AssetConfig {
    pub fn entry_path(&self) -> PathBuf {
        self.root.join(&self.entry_document)
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            entry_document: PathBuf::from("index.html"),
        }
    }
}

/// API namespace configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Path prefix routed to the API handler set.
    pub prefix: String,

    /// Base URL of the upstream API service (e.g., "http://127.0.0.1:4000").
    pub upstream: Option<String>,

    /// Upstream request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api".to_string(),
            upstream: None,
            timeout_secs: 30,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Time allowed for in-flight requests to drain on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 100 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
