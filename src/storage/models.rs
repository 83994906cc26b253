// storage/models.rs
// Durable usage records and their row mappings

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// One closed-out subscription cycle, as written to `api_usage_log`.
///
/// Append-only: entries are never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageLogEntry {
    pub calls_this_cycle: u64,
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
    /// Wall-clock time of the write
    pub logged_at: DateTime<Utc>,
}

/// Raw `usage_snapshot` row. SQLite stores integers as `i64`, so the
/// call count is validated before it becomes a `UsageState`.
#[derive(sqlx::FromRow)]
pub(crate) struct SnapshotRow {
    pub calls_this_cycle: i64,
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
}

#[derive(sqlx::FromRow)]
pub(crate) struct UsageLogRow {
    pub calls_this_cycle: i64,
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
    pub logged_at: DateTime<Utc>,
}

impl From<UsageLogRow> for UsageLogEntry {
    fn from(row: UsageLogRow) -> Self {
        Self {
            calls_this_cycle: u64::try_from(row.calls_this_cycle).unwrap_or(0),
            cycle_start: row.cycle_start,
            cycle_end: row.cycle_end,
            logged_at: row.logged_at,
        }
    }
}

/// Converts a call count to the SQLite integer type, saturating at `i64::MAX`.
pub(crate) fn calls_to_db(calls: u64) -> i64 {
    i64::try_from(calls).unwrap_or(i64::MAX)
}
