//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `flight_proxy` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use flight_proxy::initialization::init_logger_with;
use flight_proxy::{run_server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists), so the
    // upstream API key does not have to be exported manually
    if dotenvy::dotenv().is_err() {
        // If .env not found in current dir, try next to the executable
        if let Some(env_path) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(".env")))
            .filter(|path| path.exists())
        {
            let _ = dotenvy::from_path(&env_path);
        }
    }

    let config = Config::parse();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    if config.upstream_api_key.is_empty() {
        log::warn!("No upstream API key configured; upstream requests will be rejected");
    }

    if let Err(e) = run_server(config).await {
        eprintln!("flight_proxy error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
