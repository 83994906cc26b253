//! Durable usage store: the persisted ledger snapshot and the cycle log.
//!
//! The two artifacts get different guarantees. The snapshot is a single
//! overwritable row written once per attempt behind a circuit breaker; losing a
//! write only costs accuracy across a restart. The cycle log is append-only and
//! every append runs under the transient-fault retry policy.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use sqlx::SqlitePool;

use super::circuit_breaker::WriteCircuitBreaker;
use super::models::{calls_to_db, SnapshotRow, UsageLogEntry};
use super::retry::execute_with_retry;
use crate::config::STORE_TIMEOUT_SECS;
use crate::error_handling::{DatabaseError, RetryPolicy};
use crate::usage::UsageState;

/// Persistence boundary of the usage coordinator.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Last persisted ledger, or a fresh cycle starting `today` when there is none.
    async fn load_snapshot(&self, today: NaiveDate) -> Result<UsageState, DatabaseError>;

    /// Overwrites the persisted ledger. Last write wins.
    async fn save_snapshot(&self, state: &UsageState) -> Result<(), DatabaseError>;

    /// Appends one closed cycle to the durable log.
    async fn append_cycle_log(&self, entry: &UsageLogEntry) -> Result<(), DatabaseError>;
}

pub struct SqliteUsageStore {
    pool: Arc<SqlitePool>,
    retry: RetryPolicy,
    timeout: Duration,
    breaker: WriteCircuitBreaker,
}

impl SqliteUsageStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            pool,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(STORE_TIMEOUT_SECS),
            breaker: WriteCircuitBreaker::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Upper bound for a single statement attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: WriteCircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn bounded<T, Fut>(&self, operation: &'static str, fut: Fut) -> Result<T, DatabaseError>
    where
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(DatabaseError::from),
            Err(_) => Err(DatabaseError::Timeout {
                operation,
                timeout: self.timeout,
            }),
        }
    }

    async fn fetch_snapshot(&self) -> Result<Option<SnapshotRow>, DatabaseError> {
        self.bounded(
            "load usage snapshot",
            sqlx::query_as::<_, SnapshotRow>(
                "SELECT calls_this_cycle, cycle_start, cycle_end FROM usage_snapshot WHERE id = 1",
            )
            .fetch_optional(self.pool.as_ref()),
        )
        .await
    }
}

/// Decode failures mean the row itself is unusable, not that the store is down.
fn is_corrupt_row(err: &DatabaseError) -> bool {
    matches!(
        err,
        DatabaseError::SqlError(sqlx::Error::ColumnDecode { .. })
            | DatabaseError::SqlError(sqlx::Error::Decode(_))
    )
}

#[async_trait]
impl UsageStore for SqliteUsageStore {
    async fn load_snapshot(&self, today: NaiveDate) -> Result<UsageState, DatabaseError> {
        let row = match execute_with_retry(&self.retry, "load usage snapshot", || {
            self.fetch_snapshot()
        })
        .await
        {
            Ok(row) => row,
            Err(e) if is_corrupt_row(&e) => {
                warn!("Usage snapshot is unreadable ({e}), starting a fresh cycle");
                return Ok(UsageState::fresh(today));
            }
            Err(e) => return Err(e),
        };

        let Some(row) = row else {
            debug!("No usage snapshot found, starting a fresh cycle at {today}");
            return Ok(UsageState::fresh(today));
        };

        let Ok(calls_this_cycle) = u64::try_from(row.calls_this_cycle) else {
            warn!(
                "Usage snapshot has a negative call count ({}), starting a fresh cycle",
                row.calls_this_cycle
            );
            return Ok(UsageState::fresh(today));
        };

        let state = UsageState {
            calls_this_cycle,
            cycle_start: row.cycle_start,
            cycle_end: row.cycle_end,
        };
        if !state.is_consistent() {
            warn!(
                "Usage snapshot cycle {} to {} is inverted, starting a fresh cycle",
                state.cycle_start, state.cycle_end
            );
            return Ok(UsageState::fresh(today));
        }

        Ok(state)
    }

    async fn save_snapshot(&self, state: &UsageState) -> Result<(), DatabaseError> {
        if let Some(remaining) = self.breaker.remaining_cooldown() {
            return Err(DatabaseError::CircuitOpen { remaining });
        }

        let result = self
            .bounded(
                "save usage snapshot",
                sqlx::query(
                    "INSERT INTO usage_snapshot (id, calls_this_cycle, cycle_start, cycle_end, updated_at)
                     VALUES (1, ?, ?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET
                        calls_this_cycle = excluded.calls_this_cycle,
                        cycle_start = excluded.cycle_start,
                        cycle_end = excluded.cycle_end,
                        updated_at = excluded.updated_at",
                )
                .bind(calls_to_db(state.calls_this_cycle))
                .bind(state.cycle_start)
                .bind(state.cycle_end)
                .bind(Utc::now())
                .execute(self.pool.as_ref()),
            )
            .await;

        match result {
            Ok(_) => {
                self.breaker.record_success();
                Ok(())
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e)
            }
        }
    }

    async fn append_cycle_log(&self, entry: &UsageLogEntry) -> Result<(), DatabaseError> {
        execute_with_retry(&self.retry, "append cycle log", || {
            self.bounded(
                "append cycle log",
                sqlx::query(
                    "INSERT INTO api_usage_log (calls_this_cycle, cycle_start, cycle_end, logged_at)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(calls_to_db(entry.calls_this_cycle))
                .bind(entry.cycle_start)
                .bind(entry.cycle_end)
                .bind(entry.logged_at)
                .execute(self.pool.as_ref()),
            )
        })
        .await?;
        Ok(())
    }
}
