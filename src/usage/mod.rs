//! Usage tracking across monthly subscription cycles.
//!
//! - `ledger`: calls made in the active cycle and its bounds
//! - `cycle`: calendar-month arithmetic anchored on the subscription start
//! - `coordinator`: the only owner of the ledger; registers calls and rolls cycles over
//! - `clock`: injectable time source

mod clock;
mod coordinator;
mod cycle;
mod ledger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::UsageCoordinator;
pub use cycle::{
    add_months, current_cycle_start, cycle_end_for, first_cycle_start_after, next_cycle_start,
};
pub use ledger::UsageState;
