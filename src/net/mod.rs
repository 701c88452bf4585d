//! Network layer subsystem.
//!
//! Plain TCP listening is left to `axum::serve`; this module only prepares
//! the optional TLS acceptor.

pub mod tls;

pub use tls::load_tls_config;
