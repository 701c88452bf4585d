//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request that passed every guard
//!     → router.rs (namespace check via matcher.rs)
//!     ├─ under API prefix → upstream.rs (forward) or 503 when unconfigured
//!     └─ otherwise        → assets.rs (file, else entry document at 200)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)

pub mod assets;
pub mod matcher;
pub mod router;
pub mod upstream;

pub use assets::{asset_service, EntryDocument};
pub use matcher::NamespaceMatcher;
pub use router::SiteRouter;
pub use upstream::{unconfigured_api, UpstreamApi, UpstreamError};
