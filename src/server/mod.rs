//! Inbound HTTP surface.
//!
//! Routes, all under `/api/flightinfo`:
//! - `/departures` and `/arrivals` - flights for an airport, through the cache gate
//! - `/ping` - liveness
//! - `/usage` - ledger, active tier and gate outcome counters as JSON

mod handlers;
mod types;

use std::future::Future;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use handlers::{arrivals_handler, departures_handler, ping_handler, usage_handler};
pub use handlers::retain_upcoming;
pub use types::{AppState, FlightParams, UsageResponse};

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/flightinfo/departures", get(departures_handler))
        .route("/api/flightinfo/arrivals", get(arrivals_handler))
        .route("/api/flightinfo/ping", get(ping_handler))
        .route("/api/flightinfo/usage", get(usage_handler))
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), anyhow::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| anyhow::anyhow!("Failed to read listener address: {}", e))?;
    log::info!("Flight proxy listening on http://{}/api/flightinfo/", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    log::info!("Flight proxy stopped");
    Ok(())
}
