use chrono::{DateTime, Duration, Utc};

/// Length of the rolling window every metric is computed over.
pub const WINDOW_DAYS: i64 = 30;

/// A closed time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The trailing `days` ending at `now`.
    pub fn trailing_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    /// The standard 30-day window ending at `now`.
    pub fn last_30_days(now: DateTime<Utc>) -> Self {
        Self::trailing_days(now, WINDOW_DAYS)
    }

    /// Inclusive on both ends.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// Like [`contains`](Self::contains) but false for a missing timestamp.
    pub fn contains_opt(&self, ts: Option<DateTime<Utc>>) -> bool {
        ts.is_some_and(|t| self.contains(t))
    }

    /// Whole days in the window, floored at 1 so it can be used as a divisor.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().max(1)
    }
}
