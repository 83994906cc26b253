//! Transient-fault classification and retry strategy.
//!
//! Only faults that might succeed on a later attempt are retried: lost
//! connections, lock/serialization conflicts and timeouts. Constraint
//! violations and a closed pool surface immediately.

use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;

use super::types::DatabaseError;

/// SQLSTATE codes treated as transient for server-backed stores.
///
/// - `08006` connection failure
/// - `08001` cannot establish connection
/// - `57P01` admin shutdown
/// - `53300` too many connections
/// - `40001` serialization failure
const TRANSIENT_SQLSTATES: &[&str] = &["08006", "08001", "57P01", "53300", "40001"];

/// SQLite result codes treated as transient (primary and extended).
///
/// - `5` SQLITE_BUSY, `261` BUSY_RECOVERY, `517` BUSY_SNAPSHOT, `773` BUSY_TIMEOUT
/// - `6` SQLITE_LOCKED, `262` LOCKED_SHAREDCACHE
/// - `10` SQLITE_IOERR
const TRANSIENT_SQLITE_CODES: &[&str] = &["5", "261", "517", "773", "6", "262", "10"];

/// Backoff parameters for the retried write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Base of the exponential backoff in milliseconds
    pub base_ms: u64,
    /// Multiplier applied to every delay
    pub factor: u64,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Retries after the initial attempt
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_ms: crate::config::RETRY_BACKOFF_BASE,
            factor: crate::config::RETRY_FACTOR,
            max_delay: Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS),
            max_retries: crate::config::RETRY_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Same retry ceiling without waiting between attempts.
    pub fn without_delay() -> Self {
        Self {
            base_ms: 0,
            factor: 1,
            max_delay: Duration::ZERO,
            max_retries: crate::config::RETRY_MAX_RETRIES,
        }
    }
}

/// Creates an exponential backoff retry strategy.
///
/// With the default policy the delays are 2s, 4s and 8s: `tokio_retry`
/// yields `base^n` milliseconds for retry `n`, which `factor` scales to seconds.
///
/// # Returns
///
/// A retry strategy iterator ready for use with `tokio_retry::RetryIf`,
/// limited to `max_retries` delays.
pub fn get_retry_strategy(policy: &RetryPolicy) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(policy.base_ms)
        .factor(policy.factor)
        .max_delay(policy.max_delay)
        .take(policy.max_retries)
}

impl DatabaseError {
    /// Determines whether the error is a transient storage fault.
    pub fn is_transient(&self) -> bool {
        match self {
            DatabaseError::Timeout { .. } => true,
            DatabaseError::SqlError(e) => is_transient_sqlx_error(e),
            DatabaseError::FileCreationError(_)
            | DatabaseError::MigrationError(_)
            | DatabaseError::CircuitOpen { .. } => false,
        }
    }
}

fn is_transient_sqlx_error(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            TRANSIENT_SQLSTATES.contains(&code.as_ref())
                || TRANSIENT_SQLITE_CODES.contains(&code.as_ref())
        }),
        _ => false,
    }
}
