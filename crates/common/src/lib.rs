//! Framepipe Common Utilities
//!
//! Shared infrastructure for all Framepipe crates:
//! - Error taxonomy and result alias
//! - Export clock (elapsed time, ETA)
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
