// storage/migrations.rs
// Database migration management

use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;

/// Runs the SQLx migrations embedded from the `migrations/` directory.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
