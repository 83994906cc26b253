//! HTTP client initialization.
//!
//! This module builds the shared `reqwest` client used for upstream calls.

use std::sync::Arc;

use reqwest::ClientBuilder;

use crate::config::{Config, DEFAULT_USER_AGENT};
use crate::error_handling::InitializationError;

/// Initializes the upstream HTTP client.
///
/// Creates a `reqwest::Client` configured with:
/// - The per-request upstream timeout from the configuration
/// - The crate User-Agent
///
/// Authentication headers are added per request by the upstream client.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(config: &Config) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(config.upstream_timeout())
        .user_agent(DEFAULT_USER_AGENT)
        .build()?;
    Ok(Arc::new(client))
}
