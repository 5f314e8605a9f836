use chrono::{DateTime, Utc};

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Round to two decimal places (applied once, at the point of return).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fractional days from `from` to `to`. Negative if `to` precedes `from`.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    seconds_between(from, to) / SECONDS_PER_DAY
}

/// Fractional hours from `from` to `to`.
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    seconds_between(from, to) / SECONDS_PER_HOUR
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    delta.num_milliseconds() as f64 / 1000.0
}
