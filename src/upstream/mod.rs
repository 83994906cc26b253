//! Upstream flight-data API boundary.

mod client;
mod timestamp;
mod types;

pub use client::{classify_body, classify_status, rate_limit_info, AeroDataBoxClient, FlightSource};
pub use timestamp::parse_upstream_timestamp;
pub use types::{
    Direction, FlightInfo, FlightQuery, FlightTimestamp, RateLimitInfo, UpstreamOutcome,
};
