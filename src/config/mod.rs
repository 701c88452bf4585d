//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file)
//!     → loader.rs (environment / CLI overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared by value into each pipeline stage at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs, except the CSRF secret
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, Overrides};
pub use schema::{
    ApiConfig, AssetConfig, CorsConfig, CsrfConfig, GatewayConfig, HeaderConfig,
    LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig, RateLimitConfig,
    TimeoutConfig, TlsConfig,
};
pub use validation::ValidationError;
