// storage/mod.rs
// Durable usage store module

pub mod circuit_breaker;
pub mod migrations;
pub mod models;
pub mod pool;
mod queries;
mod retry;
mod store;
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use circuit_breaker::WriteCircuitBreaker;
pub use migrations::run_migrations;
pub use models::UsageLogEntry;
pub use pool::init_db_pool_with_path;
pub use queries::query_usage_history;
pub use retry::execute_with_retry;
pub use store::{SqliteUsageStore, UsageStore};
