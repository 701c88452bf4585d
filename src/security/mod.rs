//! Security subsystem: the protective pipeline.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs    (HeaderGuard: hardening headers on the way out)
//!     → origin.rs     (OriginGate: CORS allow-list)
//!     → rate_limit.rs (per-client window, 429)
//!     → csrf.rs       (token issuance, 403 on state-changing requests)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Stages run in a fixed order and short-circuit on rejection
//! - Every rejection becomes a response at the stage that produced it
//! - No trust in client input

pub mod client;
pub mod csrf;
pub mod headers;
pub mod origin;
pub mod rate_limit;
pub mod rejection;

pub use client::ClientIdentity;
pub use csrf::{CsrfToken, CsrfTokenManager, Secret, SecretError};
pub use headers::HeaderPolicy;
pub use origin::OriginAllowList;
pub use rate_limit::{Admission, RateLimiter};
pub use rejection::Rejection;
