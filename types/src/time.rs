//! Timestamp type and UTC hour/day bucketing.
//!
//! Timestamps are Unix epoch seconds (UTC), exactly as the ledger reports them
//! in block headers. Hour and day buckets are aligned to UTC boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SECS_PER_MINUTE: u64 = 60;
pub const SECS_PER_HOUR: u64 = 3_600;
pub const SECS_PER_DAY: u64 = 86_400;

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether this timestamp + duration has passed relative to `now`.
    pub fn has_expired(&self, duration_secs: u64, now: Timestamp) -> bool {
        now.0 >= self.0.saturating_add(duration_secs)
    }

    /// Start of the UTC hour containing this timestamp.
    pub fn hour_start(&self) -> Self {
        Self(self.0 - self.0 % SECS_PER_HOUR)
    }

    /// Start of the UTC day containing this timestamp.
    pub fn day_start(&self) -> Self {
        Self(self.0 - self.0 % SECS_PER_DAY)
    }

    /// Minute within the hour, `0..60`.
    pub fn minute_of_hour(&self) -> u64 {
        (self.0 % SECS_PER_HOUR) / SECS_PER_MINUTE
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.0)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    fn format_or_raw(&self, pattern: &str) -> String {
        match self.to_datetime() {
            Some(dt) => dt.format(pattern).to_string(),
            None => self.0.to_string(),
        }
    }

    /// Label of the hour bucket, e.g. `2021-11-12T05:00UTC`.
    pub fn hour_label(&self) -> String {
        self.hour_start().format_or_raw("%Y-%m-%dT%H:00UTC")
    }

    /// Label of the day bucket, e.g. `2021-11-12`.
    pub fn day_label(&self) -> String {
        self.day_start().format_or_raw("%Y-%m-%d")
    }

    /// Human-readable hour range, e.g. `2021-11-12 05:00-06:00 UTC`.
    pub fn hour_range(&self) -> String {
        let start = self.hour_start();
        let end = Self(start.0 + SECS_PER_HOUR);
        format!(
            "{}-{} UTC",
            start.format_or_raw("%Y-%m-%d %H:%M"),
            end.format_or_raw("%H:%M")
        )
    }

    /// Human-readable day range, e.g. `2021-11-12 00:00-24:00 UTC`.
    pub fn day_range(&self) -> String {
        format!("{}-24:00 UTC", self.day_start().format_or_raw("%Y-%m-%d %H:%M"))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_or_raw("%Y-%m-%dT%H:%M:%SZ"))
    }
}

/// Source of wall-clock time.
///
/// Injected wherever behaviour depends on "now" (price staleness, the
/// processing-day guard, the puller's poll cadence) so tests can pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
