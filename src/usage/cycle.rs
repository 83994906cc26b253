//! Calendar-month cycle arithmetic.
//!
//! Month addition clamps to the last day of the target month, so an anchor on
//! the 31st yields cycle starts on the 28th/29th/30th in shorter months.

use chrono::{Datelike, Months, NaiveDate};

/// Adds whole calendar months, clamping to month end.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Inclusive end of a cycle that starts on `start`: one month minus one day.
pub fn cycle_end_for(start: NaiveDate) -> NaiveDate {
    let next = add_months(start, 1);
    next.pred_opt().unwrap_or(start)
}

/// Whole calendar months elapsed from `anchor` up to `today`.
///
/// A month only counts once its anchor day has been reached, so the anchor
/// day of every later month begins a new cycle.
pub fn months_elapsed(anchor: NaiveDate, today: NaiveDate) -> u32 {
    if today <= anchor {
        return 0;
    }

    let months = (today.year() - anchor.year()) * 12 + today.month() as i32
        - anchor.month() as i32;
    let mut months = u32::try_from(months).unwrap_or(0);
    if months > 0 && add_months(anchor, months) > today {
        months -= 1;
    }
    months
}

/// Start of the anchor-derived cycle containing `today`.
pub fn current_cycle_start(anchor: NaiveDate, today: NaiveDate) -> NaiveDate {
    add_months(anchor, months_elapsed(anchor, today))
}

/// Start of the anchor-derived cycle after the one containing `today`.
pub fn next_cycle_start(anchor: NaiveDate, today: NaiveDate) -> NaiveDate {
    add_months(anchor, months_elapsed(anchor, today) + 1)
}

/// First anchor-derived cycle start strictly after `date`.
pub fn first_cycle_start_after(anchor: NaiveDate, date: NaiveDate) -> NaiveDate {
    if date < anchor {
        anchor
    } else {
        next_cycle_start(anchor, date)
    }
}
