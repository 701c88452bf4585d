//! Configuration loading from disk and the environment.

use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment-style settings layered over the file configuration.
///
/// Every field doubles as a CLI flag and an environment variable.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Port to listen on.
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    /// Interface to bind. Read from `BIND_HOST`, not the `HOST` many shells
    /// set to the machine's hostname.
    #[arg(long, env = "BIND_HOST", global = true)]
    pub host: Option<String>,

    /// Permitted cross-origin reader(s), comma separated.
    #[arg(long = "allowed-origin", env = "CORS_WHITELIST", global = true)]
    pub allowed_origin: Option<String>,

    /// Rate-limit window in milliseconds.
    #[arg(long, env = "RATE_LIMIT_WINDOW_MS", global = true)]
    pub window_ms: Option<u64>,

    /// Requests admitted per client per window.
    #[arg(long, env = "RATE_LIMIT_MAX", global = true)]
    pub max_requests: Option<u32>,

    /// Mark cookies `Secure` and enable HSTS. Accepts true/false, 1/0,
    /// yes/no and on/off.
    #[arg(
        long = "secure-cookies",
        env = "HTTPS",
        global = true,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub secure_cookies: Option<bool>,

    /// CSRF signing secret.
    #[arg(
        long = "csrf-secret",
        env = "CSRF_SECRET",
        global = true,
        hide_env_values = true
    )]
    pub csrf_secret: Option<String>,

    /// Directory holding the SPA bundle.
    #[arg(long = "assets-root", env = "ASSETS_ROOT", global = true)]
    pub assets_root: Option<PathBuf>,

    /// Upstream API base URL.
    #[arg(long = "api-upstream", env = "API_UPSTREAM", global = true)]
    pub api_upstream: Option<String>,
}

impl Overrides {
    /// Apply every set field onto `config`.
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if let Some(origin) = &self.allowed_origin {
            config.cors.allowed_origin = origin.clone();
        }
        if let Some(window_ms) = self.window_ms {
            config.rate_limit.window_ms = window_ms;
        }
        if let Some(max) = self.max_requests {
            config.rate_limit.max_requests = max;
        }
        if let Some(secure) = self.secure_cookies {
            config.csrf.secure_cookies = secure;
        }
        if let Some(secret) = &self.csrf_secret {
            config.csrf.secret = Some(secret.clone());
        }
        if let Some(root) = &self.assets_root {
            config.assets.root = root.clone();
        }
        if let Some(upstream) = &self.api_upstream {
            config.api.upstream = Some(upstream.clone());
        }
    }
}

/// Parse a TOML configuration file without validating it.
pub fn read_config_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Load defaults or `path`, layer `overrides` on top and validate the result.
pub fn load_config(
    path: Option<&Path>,
    overrides: &Overrides,
) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => GatewayConfig::default(),
    };
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
