//! Database connection pool management.
//!
//! This module initializes and configures the SQLite connection pool with:
//! - WAL mode enabled for concurrent access
//! - A busy timeout so short lock contention resolves without surfacing SQLITE_BUSY
//! - Connection limits and acquire timeouts
//! - Automatic database file creation

use std::str::FromStr;
use std::sync::Arc;

use log::{error, info};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::{DB_BUSY_TIMEOUT, DB_MAX_CONNECTIONS, STORE_TIMEOUT_SECS};
use crate::error_handling::DatabaseError;

/// Initializes and returns a database connection pool for the file at `db_path`.
///
/// Creates the parent directory and the database file if they don't exist.
///
/// # Errors
///
/// Returns `DatabaseError::FileCreationError` if the parent directory cannot be
/// created, or `DatabaseError::SqlError` if the connection fails.
pub async fn init_db_pool_with_path(
    db_path: &std::path::Path,
) -> Result<Arc<SqlitePool>, DatabaseError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            error!("Failed to create database directory {}: {e}", parent.display());
            DatabaseError::FileCreationError(e.to_string())
        })?;
    }

    let db_path_str = db_path.to_string_lossy().to_string();
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path_str))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(DB_BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .acquire_timeout(std::time::Duration::from_secs(STORE_TIMEOUT_SECS))
        .connect_with(options)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {e}");
            DatabaseError::SqlError(e)
        })?;

    info!("Usage database ready at {}", db_path_str);
    Ok(Arc::new(pool))
}
