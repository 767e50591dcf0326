//! Time partitioning.
//!
//! Every log is split into buckets: consecutive, fixed-length periods of
//! wall-clock time. A bucket is identified by the number of whole periods
//! elapsed since the Unix epoch.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const HOUR: u64 = 3600;

/// Length of a time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// One hour.
    Hour,
    /// 24 hours.
    Day,
    /// 7 days.
    Week,
    /// 4 weeks: a rolling 28-day period, not a calendar month.
    Month,
    /// 12 of the 28-day months.
    Year,
}

impl Granularity {
    /// Returns the length of one bucket in seconds.
    #[must_use]
    pub const fn seconds(self) -> u64 {
        match self {
            Self::Hour => HOUR,
            Self::Day => 24 * HOUR,
            Self::Week => 7 * 24 * HOUR,
            Self::Month => 4 * 7 * 24 * HOUR,
            Self::Year => 12 * 4 * 7 * 24 * HOUR,
        }
    }

    /// Returns the granularity for a numeric code (1 = hour ... 5 = year).
    ///
    /// # Errors
    ///
    /// Returns a configuration error for codes outside `1..=5`.
    pub fn from_code(code: u8) -> CoreResult<Self> {
        match code {
            1 => Ok(Self::Hour),
            2 => Ok(Self::Day),
            3 => Ok(Self::Week),
            4 => Ok(Self::Month),
            5 => Ok(Self::Year),
            other => Err(CoreError::configuration(format!(
                "unknown granularity code {other}"
            ))),
        }
    }

    /// Returns the numeric code of this granularity.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Hour => 1,
            Self::Day => 2,
            Self::Week => 3,
            Self::Month => 4,
            Self::Year => 5,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        };
        f.write_str(name)
    }
}

impl FromStr for Granularity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" | "hourly" => Ok(Self::Hour),
            "day" | "daily" => Ok(Self::Day),
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            "year" | "yearly" => Ok(Self::Year),
            other => match other.parse::<u8>() {
                Ok(code) => Self::from_code(code),
                Err(_) => Err(CoreError::configuration(format!(
                    "unknown granularity {s:?}"
                ))),
            },
        }
    }
}

/// Maps wall-clock time to bucket identifiers.
pub struct TimeBucket;

impl TimeBucket {
    /// Returns the bucket containing `now` (Unix seconds).
    #[must_use]
    pub const fn current_bucket(granularity: Granularity, now: u64) -> u64 {
        now / granularity.seconds()
    }

    /// Returns how long data in a bucket of this granularity is kept.
    ///
    /// Entries live for two full buckets, so a slice can still be processed
    /// after it closes, capped at one month.
    #[must_use]
    pub fn expiry_for(granularity: Granularity) -> Duration {
        let seconds = Granularity::Month
            .seconds()
            .min(2 * granularity.seconds());
        Duration::from_secs(seconds)
    }
}

/// Source of wall-clock time, in Unix seconds.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> u64;
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// A clock that only moves when told to.
///
/// Useful for tests and for replaying historical events.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    #[must_use]
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
