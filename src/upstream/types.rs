//! Upstream wire models and the flight payload served to callers.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp::deserialize_optional;

/// Which movement list is requested for an airport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Departure,
    Arrival,
}

impl Direction {
    /// Value of the upstream `direction` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Departure => "Departure",
            Direction::Arrival => "Arrival",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upstream lookup. Only `location_code` and `direction` identify the
/// cache entry; the window parameters are passed through to upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightQuery {
    pub location_code: String,
    pub direction: Direction,
    /// Signed offset from now, in minutes, where the window starts
    pub offset_minutes: i32,
    pub duration_minutes: u32,
}

/// Local and UTC renderings of one movement time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlightTimestamp {
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub utc: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub local: Option<DateTime<FixedOffset>>,
}

impl FlightTimestamp {
    pub fn utc(&self) -> Option<DateTime<Utc>> {
        self.utc.map(|t| t.with_timezone(&Utc))
    }
}

/// A flight as returned by this proxy. Cached and served verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightInfo {
    pub flight_number: Option<String>,
    pub airline: Option<String>,
    pub time_scheduled: Option<FlightTimestamp>,
    pub time_revised: Option<FlightTimestamp>,
    pub time_runway: Option<FlightTimestamp>,
    pub airport: Option<String>,
    pub status: Option<String>,
    pub gate: Option<String>,
    pub terminal: Option<String>,
    pub aircraft_model: Option<String>,
    pub direction: Direction,
}

impl FlightInfo {
    /// Scheduled time in UTC, used to filter and order responses.
    pub fn scheduled_utc(&self) -> Option<DateTime<Utc>> {
        self.time_scheduled.as_ref().and_then(FlightTimestamp::utc)
    }
}

/// Quota details read from a 429 response, when upstream provides them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RateLimitInfo {
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Classified result of one upstream request.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutcome {
    Success(Vec<FlightInfo>),
    /// Upstream reported no data for the window
    Empty,
    RateLimited(RateLimitInfo),
    /// 2xx with a blank or undecodable body
    MalformedResponse,
    /// Network error, timeout or unexpected status
    TransportFailure,
}

// AeroDataBox response documents. Unknown fields are ignored.

#[derive(Debug, Deserialize)]
pub(crate) struct AeroDataBoxResponse {
    pub departures: Option<Vec<FlightRecord>>,
    pub arrivals: Option<Vec<FlightRecord>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FlightRecord {
    pub movement: Option<MovementInfo>,
    pub number: Option<String>,
    pub status: Option<String>,
    pub aircraft: Option<AircraftInfo>,
    pub airline: Option<AirlineInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MovementInfo {
    pub airport: Option<AirportInfo>,
    pub scheduled_time: Option<FlightTimestamp>,
    pub revised_time: Option<FlightTimestamp>,
    pub runway_time: Option<FlightTimestamp>,
    pub terminal: Option<String>,
    pub gate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AirportInfo {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AircraftInfo {
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AirlineInfo {
    pub name: Option<String>,
}

impl FlightRecord {
    pub(crate) fn into_flight_info(self, direction: Direction) -> FlightInfo {
        let movement = self.movement;
        let (airport, scheduled, revised, runway, terminal, gate) = match movement {
            Some(m) => (
                m.airport.and_then(|a| a.name),
                m.scheduled_time,
                m.revised_time,
                m.runway_time,
                m.terminal,
                m.gate,
            ),
            None => (None, None, None, None, None, None),
        };

        FlightInfo {
            flight_number: self.number,
            airline: self.airline.and_then(|a| a.name),
            time_scheduled: scheduled,
            time_revised: revised,
            time_runway: runway,
            airport,
            status: self.status,
            gate,
            terminal,
            aircraft_model: self.aircraft.and_then(|a| a.model),
            direction,
        }
    }
}
