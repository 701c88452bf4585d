//! SPA gateway library
//!
//! The pipeline is assembled by [`HttpServer`]; each guard lives in
//! [`security`] and can be used on its own.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
