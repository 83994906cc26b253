//! Server state and request/response shapes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cache::FreshnessGate;
use crate::throttle::Tier;
use crate::usage::Clock;

/// Shared state for the handlers
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<FreshnessGate>,
    pub clock: Arc<dyn Clock>,
}

/// Query string of the flight endpoints. All three parameters are required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightParams {
    pub iata_code: String,
    pub offset_minutes: i32,
    pub duration_minutes: u32,
}

/// JSON response for `/usage`
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub calls_this_cycle: u64,
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
    pub credits_remaining: i64,
    pub tier: Tier,
    pub interval_seconds: u64,
    pub cached_keys: usize,
    pub outcomes: HashMap<&'static str, usize>,
}
