//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;
use std::io;

use crate::config::TlsConfig;

/// Load the PEM certificate chain and private key named in `config`.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, io::Error> {
    for (what, path) in [
        ("Certificate", &config.cert_path),
        ("Private key", &config.key_path),
    ] {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{what} file not found: {path:?}"),
            ));
        }
    }

    RustlsConfig::from_pem_file(&config.cert_path, &config.key_path).await
}
