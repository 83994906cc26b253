//! HTTP handlers.

mod flights;
mod usage;

pub use flights::{arrivals_handler, departures_handler, ping_handler, retain_upcoming};
pub use usage::usage_handler;
