// storage/queries.rs
// Read-side queries over the cycle log

use sqlx::SqlitePool;

use super::models::{UsageLogEntry, UsageLogRow};
use crate::error_handling::DatabaseError;

/// Every closed cycle in the log, oldest cycle first.
pub async fn query_usage_history(pool: &SqlitePool) -> Result<Vec<UsageLogEntry>, DatabaseError> {
    let rows = sqlx::query_as::<_, UsageLogRow>(
        "SELECT calls_this_cycle, cycle_start, cycle_end, logged_at
         FROM api_usage_log
         ORDER BY cycle_start, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(UsageLogEntry::from).collect())
}
