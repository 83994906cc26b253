//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, throttle tiers, retry parameters)
//! - CLI/library configuration types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};
