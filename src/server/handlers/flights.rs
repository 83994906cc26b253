//! Flight list handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, TimeDelta, Utc};

use super::super::types::{AppState, FlightParams};
use crate::config::STALE_FLIGHT_CUTOFF_MINUTES;
use crate::upstream::{Direction, FlightInfo, FlightQuery};

pub async fn departures_handler(
    State(state): State<AppState>,
    Query(params): Query<FlightParams>,
) -> Json<Vec<FlightInfo>> {
    Json(fetch(&state, params, Direction::Departure).await)
}

pub async fn arrivals_handler(
    State(state): State<AppState>,
    Query(params): Query<FlightParams>,
) -> Json<Vec<FlightInfo>> {
    Json(fetch(&state, params, Direction::Arrival).await)
}

pub async fn ping_handler() -> &'static str {
    "FlightInfo API is awake"
}

async fn fetch(state: &AppState, params: FlightParams, direction: Direction) -> Vec<FlightInfo> {
    log::info!(
        "Fetching {} for {}, offset {}, duration {}",
        direction,
        params.iata_code,
        params.offset_minutes,
        params.duration_minutes
    );

    let query = FlightQuery {
        location_code: params.iata_code,
        direction,
        offset_minutes: params.offset_minutes,
        duration_minutes: params.duration_minutes,
    };
    let flights = state.gate.get_flights(&query).await;
    retain_upcoming(flights, state.clock.now())
}

/// Drops flights scheduled more than the cutoff before `now` (or with no
/// scheduled time) and orders the rest by scheduled UTC time.
pub fn retain_upcoming(mut flights: Vec<FlightInfo>, now: DateTime<Utc>) -> Vec<FlightInfo> {
    let cutoff = now - TimeDelta::minutes(STALE_FLIGHT_CUTOFF_MINUTES);
    flights.retain(|f| f.scheduled_utc().is_some_and(|t| t >= cutoff));
    flights.sort_by_key(FlightInfo::scheduled_utc);
    flights
}
