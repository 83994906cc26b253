//! Error handling and outcome statistics.
//!
//! This module provides:
//! - Error type definitions (initialization, configuration, storage)
//! - Transient-fault classification and retry strategy configuration
//! - Outcome statistics for the cache freshness gate

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{get_retry_strategy, RetryPolicy};
pub use stats::OutcomeStats;
pub use types::{ConfigError, DatabaseError, InitializationError, OutcomeType};
