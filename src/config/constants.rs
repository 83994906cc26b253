//! Configuration constants.
//!
//! This module defines the defaults used throughout the application,
//! including timeouts, throttle tiers, and retry parameters.

use std::time::Duration;

pub const DB_PATH: &str = "./flight_proxy.db";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

// Upstream (AeroDataBox via RapidAPI)
pub const DEFAULT_UPSTREAM_BASE_URL: &str =
    "https://aerodatabox.p.rapidapi.com/flights/airports/iata/";
pub const DEFAULT_UPSTREAM_HOST: &str = "aerodatabox.p.rapidapi.com";
/// Per-request timeout for the upstream call in seconds
pub const UPSTREAM_TIMEOUT_SECS: u64 = 10;
/// User-Agent sent to the upstream API
pub const DEFAULT_USER_AGENT: &str = concat!("flight_proxy/", env!("CARGO_PKG_VERSION"));

// Throttle tiers (credits and seconds)
/// Total credits available at the start of a subscription cycle.
/// Tier 1 applies while remaining credits stay above the tier 2 threshold.
pub const DEFAULT_TIER1_THRESHOLD: i64 = 1000;
pub const DEFAULT_TIER2_THRESHOLD: i64 = 500;
pub const DEFAULT_TIER3_THRESHOLD: i64 = 250;
pub const DEFAULT_TIER1_INTERVAL_SECS: u64 = 120;
pub const DEFAULT_TIER2_INTERVAL_SECS: u64 = 240;
pub const DEFAULT_TIER3_INTERVAL_SECS: u64 = 480;

// Durable store
/// Upper bound on a single snapshot or cycle-log statement
pub const STORE_TIMEOUT_SECS: u64 = 5;
/// Maximum pooled SQLite connections
pub const DB_MAX_CONNECTIONS: u32 = 5;
/// How long a connection waits on a locked database before SQLITE_BUSY
pub const DB_BUSY_TIMEOUT: Duration = Duration::from_secs(2);

// Retry strategy for the cycle log
/// Base of the exponential backoff; delay for retry `n` is `base^n * factor` ms
pub const RETRY_BACKOFF_BASE: u64 = 2;
/// Multiplier applied to the backoff (1000 turns the base into seconds: 2s, 4s, 8s)
pub const RETRY_FACTOR: u64 = 1000;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 8;
/// Retries after the initial attempt
pub const RETRY_MAX_RETRIES: usize = 3;

// Inbound surface
/// Flights scheduled further in the past than this are dropped from responses
pub const STALE_FLIGHT_CUTOFF_MINUTES: i64 = 10;

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_NO_CONTENT: u16 = 204;
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

// Upstream header names
pub const HEADER_RAPIDAPI_KEY: &str = "X-RapidAPI-Key";
pub const HEADER_RAPIDAPI_HOST: &str = "X-RapidAPI-Host";
pub const HEADER_RATE_LIMIT_REMAINING: &str = "X-RateLimit-Tier-2-Remaining";
pub const HEADER_RATE_LIMIT_RESET: &str = "X-RateLimit-Tier-2-Reset";
