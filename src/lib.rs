//! flight_proxy library: a caching proxy in front of a metered flight-data API
//!
//! Every upstream call spends one credit from a monthly subscription budget.
//! The proxy caches flight lists per airport and direction, and stretches the
//! minimum interval between upstream refreshes as the cycle's remaining credits
//! fall through configured tiers. Completed cycles are logged durably in SQLite.
//!
//! # Example
//!
//! ```no_run
//! use flight_proxy::{run_server, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config {
//!     upstream_api_key: "my-rapidapi-key".to_string(),
//!     tier1_threshold: 3000,
//!     ..Default::default()
//! };
//!
//! run_server(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod cache;
pub mod config;
pub mod error_handling;
pub mod initialization;
pub mod server;
pub mod storage;
pub mod throttle;
pub mod upstream;
pub mod usage;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use run::{init_app_state, run_server, run_server_on};
pub use storage::{query_usage_history, run_migrations, UsageLogEntry};

// Internal run module (wires the components together and serves them)
mod run {
    use std::future::Future;
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use log::{info, warn};
    use tokio::net::TcpListener;

    use crate::cache::FreshnessGate;
    use crate::config::Config;
    use crate::error_handling::OutcomeStats;
    use crate::initialization::init_client;
    use crate::server::{serve, AppState};
    use crate::storage::{init_db_pool_with_path, run_migrations, SqliteUsageStore};
    use crate::upstream::AeroDataBoxClient;
    use crate::usage::{Clock, UsageCoordinator};

    /// Builds every shared component from `config`.
    ///
    /// Opens (and migrates) the usage database, restores the ledger from its
    /// last snapshot and wires the upstream client into the cache gate.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The throttle tiers are not ordered
    /// - The database cannot be opened or migrated
    /// - The persisted ledger cannot be read
    /// - The HTTP client cannot be built
    pub async fn init_app_state(config: &Config, clock: Arc<dyn Clock>) -> Result<AppState> {
        let throttle = config
            .throttle_config()
            .context("Invalid throttle configuration")?;
        if throttle.subscription_start.is_none() {
            warn!("No subscription start date configured, cycles run one month from the ledger's first day");
        }

        let pool = init_db_pool_with_path(&config.db_path)
            .await
            .context("Failed to initialize database pool")?;
        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        let store =
            Arc::new(SqliteUsageStore::new(Arc::clone(&pool)).with_timeout(config.store_timeout()));
        let usage = UsageCoordinator::load(throttle, store, Arc::clone(&clock))
            .await
            .context("Failed to load usage ledger")?;
        info!(
            "Throttle tier {} active ({}s minimum refresh interval)",
            usage.current_tier(),
            usage.current_interval().as_secs()
        );

        let client = init_client(config).context("Failed to initialize HTTP client")?;
        let source = Arc::new(AeroDataBoxClient::from_config(client, config));

        let gate = FreshnessGate::new(
            source,
            Arc::new(usage),
            Arc::clone(&clock),
            Arc::new(OutcomeStats::new()),
        );

        Ok(AppState {
            gate: Arc::new(gate),
            clock,
        })
    }

    /// Runs the proxy on `config.listen_addr` until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if startup fails (see [`init_app_state`]) or the
    /// listener cannot be bound.
    pub async fn run_server(config: Config) -> Result<()> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

        run_server_on(config, listener, shutdown_signal()).await
    }

    /// Runs the proxy on an already bound listener until `shutdown` resolves.
    pub async fn run_server_on<F>(config: Config, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = init_app_state(&config, Arc::new(crate::usage::SystemClock)).await?;
        serve(listener, state, shutdown).await
    }

    async fn shutdown_signal() {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, draining connections"),
            Err(e) => warn!("Failed to listen for shutdown signal: {e}"),
        }
    }
}
