//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, guard pipeline)
//!     → request.rs (request ID)
//!     → [routing stage decides API or site]
//!     → response.rs (hop-by-hop hygiene when relaying)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdGenerator, X_REQUEST_ID};
pub use server::{HttpServer, StartupError};
