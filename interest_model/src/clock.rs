//! Time helpers. All engine time is wall-clock UTC supplied by the caller.

use chrono::{DateTime, Utc};

pub type Timestamp = DateTime<Utc>;

pub const SECONDS_PER_HOUR: f64 = 3600.0;
pub const HOURS_PER_DAY: f64 = 24.0;

/// Hours elapsed from `since` to `now`, floored at zero.
pub fn elapsed_hours(since: Timestamp, now: Timestamp) -> f64 {
    let millis = (now - since).num_milliseconds();
    if millis <= 0 {
        0.0
    } else {
        millis as f64 / 1000.0 / SECONDS_PER_HOUR
    }
}

/// Days elapsed from `since` to `now`, floored at zero.
pub fn elapsed_days(since: Timestamp, now: Timestamp) -> f64 {
    elapsed_hours(since, now) / HOURS_PER_DAY
}
