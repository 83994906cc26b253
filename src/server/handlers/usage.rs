//! Usage status handler.

use std::time::Duration;

use axum::{extract::State, Json};

use super::super::types::{AppState, UsageResponse};
use crate::throttle::{credits_remaining, tier_for};

/// Ledger, tier and gate counters for monitoring
pub async fn usage_handler(State(state): State<AppState>) -> Json<UsageResponse> {
    let usage = state.gate.usage();
    let ledger = usage.snapshot().await;
    let tier = tier_for(ledger.calls_this_cycle, usage.config());
    let interval: Duration = usage.config().interval(tier);

    Json(UsageResponse {
        calls_this_cycle: ledger.calls_this_cycle,
        cycle_start: ledger.cycle_start,
        cycle_end: ledger.cycle_end,
        credits_remaining: credits_remaining(ledger.calls_this_cycle, usage.config()),
        tier,
        interval_seconds: interval.as_secs(),
        cached_keys: state.gate.cached_keys(),
        outcomes: state.gate.stats().snapshot(),
    })
}
