//! Ciné-Incruste Common Utilities
//!
//! Shared infrastructure for all Ciné-Incruste crates:
//! - Error types and result aliases
//! - Session clock and rate limiting for the live frame loop
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
