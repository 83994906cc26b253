//! Error type definitions.
//!
//! This module defines the error and outcome types used throughout the application.

use std::time::Duration;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for invalid throttle configuration.
///
/// These are programming-contract violations and are fatal at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Thresholds must satisfy `tier1 > tier2 > tier3 >= 0`.
    #[error("Tier thresholds must be strictly descending and non-negative (got {tier1} > {tier2} > {tier3})")]
    ThresholdsNotDescending { tier1: i64, tier2: i64, tier3: i64 },

    /// Intervals must satisfy `tier1 < tier2 < tier3`.
    #[error("Tier intervals must be strictly ascending (got {tier1:?} < {tier2:?} < {tier3:?})")]
    IntervalsNotAscending {
        tier1: Duration,
        tier2: Duration,
        tier3: Duration,
    },
}

/// Error types for durable store operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Error applying schema migrations.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// Writes are suspended after repeated failures.
    #[error("Database writes suspended for {remaining:?} after repeated failures")]
    CircuitOpen { remaining: Duration },

    /// The statement did not complete within the store timeout.
    #[error("Database operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

/// Outcomes of a pass through the cache freshness gate.
///
/// Every `get_flights` call records exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum OutcomeType {
    /// Served from cache without contacting upstream
    CacheHit,
    /// Waited on a refresh of the same key that failed, served without refetching
    SharedRefresh,
    /// Upstream returned flights
    UpstreamSuccess,
    /// Upstream reported no data
    UpstreamEmpty,
    /// Upstream signalled quota exhaustion (429)
    UpstreamRateLimited,
    /// Upstream answered 2xx with an unusable body
    UpstreamMalformed,
    /// Network error, timeout or unexpected status
    UpstreamTransportFailure,
}

impl std::fmt::Display for OutcomeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OutcomeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeType::CacheHit => "cache_hit",
            OutcomeType::SharedRefresh => "shared_refresh",
            OutcomeType::UpstreamSuccess => "upstream_success",
            OutcomeType::UpstreamEmpty => "upstream_empty",
            OutcomeType::UpstreamRateLimited => "upstream_rate_limited",
            OutcomeType::UpstreamMalformed => "upstream_malformed",
            OutcomeType::UpstreamTransportFailure => "upstream_transport_failure",
        }
    }

    /// Whether this outcome consumed an upstream credit.
    pub fn consumes_credit(&self) -> bool {
        matches!(
            self,
            OutcomeType::UpstreamSuccess | OutcomeType::UpstreamEmpty
        )
    }
}
