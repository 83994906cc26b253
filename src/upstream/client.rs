//! AeroDataBox client.
//!
//! Performs exactly one request per lookup and folds every response into an
//! [`UpstreamOutcome`]. Nothing here returns an error: the cache gate decides
//! what a failed lookup means for callers and for the credit ledger.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};

use super::types::{AeroDataBoxResponse, Direction, FlightQuery, RateLimitInfo, UpstreamOutcome};
use crate::config::{
    Config, HEADER_RAPIDAPI_HOST, HEADER_RAPIDAPI_KEY, HEADER_RATE_LIMIT_REMAINING,
    HEADER_RATE_LIMIT_RESET, HTTP_STATUS_NO_CONTENT, HTTP_STATUS_TOO_MANY_REQUESTS,
};

/// Source of flight lists for the cache gate.
#[async_trait]
pub trait FlightSource: Send + Sync {
    async fn fetch_flights(&self, query: &FlightQuery) -> UpstreamOutcome;
}

pub struct AeroDataBoxClient {
    client: Arc<reqwest::Client>,
    base_url: String,
    api_key: String,
    host: String,
}

impl AeroDataBoxClient {
    pub fn new(client: Arc<reqwest::Client>, base_url: String, api_key: String, host: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            host,
        }
    }

    pub fn from_config(client: Arc<reqwest::Client>, config: &Config) -> Self {
        Self::new(
            client,
            config.upstream_base_url.clone(),
            config.upstream_api_key.clone(),
            config.upstream_host.clone(),
        )
    }

    /// `{base_url}{location_code}`, with the code percent-encoded as a path segment.
    fn endpoint(&self, location_code: &str) -> Option<Url> {
        let mut url = Url::parse(&self.base_url).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(location_code);
        Some(url)
    }
}

#[async_trait]
impl FlightSource for AeroDataBoxClient {
    async fn fetch_flights(&self, query: &FlightQuery) -> UpstreamOutcome {
        let Some(url) = self.endpoint(&query.location_code) else {
            error!("Invalid upstream base URL: {}", self.base_url);
            return UpstreamOutcome::TransportFailure;
        };

        debug!(
            "Requesting {} {} (offset {}m, duration {}m)",
            query.location_code, query.direction, query.offset_minutes, query.duration_minutes
        );

        let response = self
            .client
            .get(url)
            .query(&[
                ("offsetMinutes", query.offset_minutes.to_string()),
                ("durationMinutes", query.duration_minutes.to_string()),
                ("withLeg", "false".to_string()),
                ("direction", query.direction.as_str().to_string()),
                ("withCancelled", "true".to_string()),
                ("withCodeshared", "false".to_string()),
                ("withCargo", "false".to_string()),
                ("withPrivate", "false".to_string()),
                ("withLocation", "false".to_string()),
            ])
            .header(HEADER_RAPIDAPI_KEY, &self.api_key)
            .header(HEADER_RAPIDAPI_HOST, &self.host)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                error!(
                    "Upstream request timed out for {} {}: {e}",
                    query.location_code, query.direction
                );
                return UpstreamOutcome::TransportFailure;
            }
            Err(e) => {
                error!(
                    "Upstream request failed for {} {}: {e}",
                    query.location_code, query.direction
                );
                return UpstreamOutcome::TransportFailure;
            }
        };

        let status = response.status();
        if let Some(outcome) = classify_status(status, response.headers(), Utc::now()) {
            log_status_outcome(&outcome, status, query);
            return outcome;
        }

        match response.text().await {
            Ok(body) => {
                let outcome = classify_body(&body, query.direction);
                if outcome == UpstreamOutcome::MalformedResponse {
                    error!(
                        "Unusable upstream body for {} {} ({} bytes)",
                        query.location_code,
                        query.direction,
                        body.len()
                    );
                }
                outcome
            }
            Err(e) => {
                error!(
                    "Failed to read upstream body for {} {}: {e}",
                    query.location_code, query.direction
                );
                UpstreamOutcome::TransportFailure
            }
        }
    }
}

fn log_status_outcome(outcome: &UpstreamOutcome, status: StatusCode, query: &FlightQuery) {
    match outcome {
        UpstreamOutcome::Empty => info!(
            "No flights returned for {} {}",
            query.location_code, query.direction
        ),
        UpstreamOutcome::RateLimited(limit) => warn!(
            "Upstream rate limit exceeded for {} {}: remaining={}, resets at {}",
            query.location_code,
            query.direction,
            limit
                .remaining
                .map_or_else(|| "unknown".to_string(), |r| r.to_string()),
            limit
                .reset_at
                .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339())
        ),
        _ => error!(
            "Unexpected upstream status {} for {} {}",
            status, query.location_code, query.direction
        ),
    }
}

/// Classifies a response by status alone.
///
/// Returns `None` for 2xx statuses other than 204, whose body decides the outcome.
pub fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Option<UpstreamOutcome> {
    match status.as_u16() {
        HTTP_STATUS_NO_CONTENT => Some(UpstreamOutcome::Empty),
        HTTP_STATUS_TOO_MANY_REQUESTS => Some(UpstreamOutcome::RateLimited(rate_limit_info(
            headers, now,
        ))),
        _ if status.is_success() => None,
        _ => Some(UpstreamOutcome::TransportFailure),
    }
}

/// Reads the remaining quota and reset delay (seconds from `now`) if present.
pub fn rate_limit_info(headers: &HeaderMap, now: DateTime<Utc>) -> RateLimitInfo {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    };

    let remaining = header(HEADER_RATE_LIMIT_REMAINING).and_then(|v| v.parse::<u32>().ok());
    let reset_at = header(HEADER_RATE_LIMIT_RESET)
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(chrono::TimeDelta::try_seconds)
        .and_then(|delay| now.checked_add_signed(delay));

    RateLimitInfo {
        remaining,
        reset_at,
    }
}

/// Classifies a 2xx body.
///
/// Blank or undecodable bodies are malformed. A decoded document without the
/// requested direction's list counts as upstream having no data.
pub fn classify_body(body: &str, direction: Direction) -> UpstreamOutcome {
    if body.trim().is_empty() {
        return UpstreamOutcome::MalformedResponse;
    }

    let document: AeroDataBoxResponse = match serde_json::from_str(body) {
        Ok(doc) => doc,
        Err(e) => {
            debug!("Upstream body failed to decode: {e}");
            return UpstreamOutcome::MalformedResponse;
        }
    };

    let records = match direction {
        Direction::Departure => document.departures,
        Direction::Arrival => document.arrivals,
    };

    match records {
        Some(records) => UpstreamOutcome::Success(
            records
                .into_iter()
                .map(|r| r.into_flight_info(direction))
                .collect(),
        ),
        None => UpstreamOutcome::Empty,
    }
}
