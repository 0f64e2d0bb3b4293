//! Reporting buckets: UTC time windows and cumulative-amount thresholds.
//!
//! Every bucket has a stable string label. Labels double as report file names,
//! so a label must never change once reports have been published under it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::{SECS_PER_DAY, SECS_PER_HOUR};
use crate::{Timestamp, UsdAmount, WeiAmount};

/// A UTC time window that blocks are aggregated over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    /// The hour starting at the given (hour-aligned) timestamp.
    Hour(Timestamp),
    /// The day starting at the given (day-aligned) timestamp.
    Day(Timestamp),
}

impl Bucket {
    /// The hour bucket containing `ts`.
    pub fn hour_of(ts: Timestamp) -> Self {
        Self::Hour(ts.hour_start())
    }

    /// The day bucket containing `ts`.
    pub fn day_of(ts: Timestamp) -> Self {
        Self::Day(ts.day_start())
    }

    pub fn start(&self) -> Timestamp {
        match self {
            Self::Hour(start) | Self::Day(start) => *start,
        }
    }

    /// Exclusive end of the window.
    pub fn end(&self) -> Timestamp {
        match self {
            Self::Hour(start) => Timestamp::new(start.as_secs() + SECS_PER_HOUR),
            Self::Day(start) => Timestamp::new(start.as_secs() + SECS_PER_DAY),
        }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start() <= ts && ts < self.end()
    }

    /// Report label, e.g. `2021-11-12T05:00UTC` or `2021-11-12`.
    pub fn label(&self) -> String {
        match self {
            Self::Hour(start) => start.hour_label(),
            Self::Day(start) => start.day_label(),
        }
    }

    /// Human-readable window, e.g. `2021-11-12 05:00-06:00 UTC`.
    pub fn range(&self) -> String {
        match self {
            Self::Hour(start) => start.hour_range(),
            Self::Day(start) => start.day_range(),
        }
    }

    /// Report title prefix.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Hour(_) => "Hourly",
            Self::Day(_) => "Daily",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind_name(), self.label())
    }
}

/// A one-shot cumulative threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Threshold {
    /// Cumulative burned ETH reached this amount.
    Eth(WeiAmount),
    /// Cumulative burned ETH, valued at the current price, reached this many dollars.
    Usd(UsdAmount),
}

impl Threshold {
    /// Report label: whole ETH (`10000`) or whole dollars with a `USD` suffix
    /// (`6000000000USD`).
    pub fn label(&self) -> String {
        match self {
            Self::Eth(amount) => amount.whole_eth().to_string(),
            Self::Usd(amount) => format!("{}USD", amount.whole_dollars()),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eth(amount) => write!(f, "{} ETH", amount.format_eth(0)),
            Self::Usd(amount) => write!(f, "{}", amount.format_compact()),
        }
    }
}
