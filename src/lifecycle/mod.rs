//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Trigger → stop accepting → drain connections (bounded by grace period)
//!             → stop rate-limit janitor → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
