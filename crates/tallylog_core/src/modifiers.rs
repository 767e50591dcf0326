//! Query modifiers.
//!
//! A [`QueryModifiers`] value describes one pending scan. It is moved into
//! [`EventLog::query`](crate::EventLog::query), so every query starts from a
//! fresh set of options.

use crate::error::{CoreError, CoreResult};
use crate::types::validate_log_name;
use std::num::NonZeroU32;
use std::time::Duration;

/// Whether, and how deeply, a query compacts what it scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregate {
    /// No compaction.
    #[default]
    Off,
    /// Fold every repeat of a key within the scanned run.
    Full,
    /// Fold at most this many occurrences of a key before starting a new
    /// generation.
    MaxLevel(NonZeroU32),
}

impl Aggregate {
    /// Returns true unless compaction is off.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Returns the fold limit, `None` meaning unbounded.
    #[must_use]
    pub const fn max_level(self) -> Option<NonZeroU32> {
        match self {
            Self::MaxLevel(level) => Some(level),
            Self::Off | Self::Full => None,
        }
    }
}

impl From<bool> for Aggregate {
    fn from(value: bool) -> Self {
        if value {
            Self::Full
        } else {
            Self::Off
        }
    }
}

impl From<u32> for Aggregate {
    /// `0` turns compaction off; any other value is a fold limit.
    fn from(level: u32) -> Self {
        NonZeroU32::new(level).map_or(Self::Off, Self::MaxLevel)
    }
}

/// Options for a single query.
///
/// # Example
///
/// ```rust
/// use tallylog_core::{Aggregate, QueryModifiers};
///
/// let modifiers = QueryModifiers::new()
///     .multi(["comments", "views"])
///     .aggregate(Aggregate::Full)
///     .limit(50);
/// assert_eq!(modifiers.limit_value(), Some(50));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryModifiers {
    limit: Option<u64>,
    offset: u64,
    reverse: bool,
    aggregate: Aggregate,
    multi: Vec<String>,
    set_waypoint: bool,
    use_waypoint: bool,
    sort: bool,
    debug: bool,
    deadline: Option<Duration>,
}

impl Default for QueryModifiers {
    fn default() -> Self {
        Self {
            limit: None,
            offset: 0,
            reverse: false,
            aggregate: Aggregate::Off,
            multi: Vec::new(),
            set_waypoint: false,
            use_waypoint: false,
            sort: true,
            debug: false,
            deadline: None,
        }
    }
}

impl QueryModifiers {
    /// Creates an empty set of modifiers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit at most `limit` entries per log. Sentinels and skipped entries
    /// don't count.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` entries of each log.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Return the final result oldest-first.
    #[must_use]
    pub const fn reverse(mut self, value: bool) -> Self {
        self.reverse = value;
        self
    }

    /// Compact the scanned run.
    #[must_use]
    pub fn aggregate(mut self, aggregate: impl Into<Aggregate>) -> Self {
        self.aggregate = aggregate.into();
        self
    }

    /// Also scan these logs (in the handle's current bucket) and merge the
    /// results.
    #[must_use]
    pub fn multi<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.multi = names.into_iter().map(Into::into).collect();
        self
    }

    /// Persist each scanned log's upper bound as its waypoint.
    #[must_use]
    pub const fn set_waypoint(mut self, value: bool) -> Self {
        self.set_waypoint = value;
        self
    }

    /// Stop scanning at each log's waypoint, and defer compaction to the
    /// data below it.
    #[must_use]
    pub const fn use_waypoint(mut self, value: bool) -> Self {
        self.use_waypoint = value;
        self
    }

    /// Sort multi-log results newest-first (on by default).
    #[must_use]
    pub const fn sort(mut self, value: bool) -> Self {
        self.sort = value;
        self
    }

    /// Trace scan statistics at debug level.
    #[must_use]
    pub const fn debug(mut self, value: bool) -> Self {
        self.debug = value;
        self
    }

    /// Give up scanning once this much time has passed; the partial result
    /// is returned.
    #[must_use]
    pub const fn deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(budget);
        self
    }

    /// Configured limit.
    #[must_use]
    pub const fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    /// Configured offset.
    #[must_use]
    pub const fn offset_value(&self) -> u64 {
        self.offset
    }

    /// Whether the result is reversed.
    #[must_use]
    pub const fn is_reversed(&self) -> bool {
        self.reverse
    }

    /// Configured compaction.
    #[must_use]
    pub const fn aggregate_value(&self) -> Aggregate {
        self.aggregate
    }

    /// Additional logs to scan.
    #[must_use]
    pub fn multi_names(&self) -> &[String] {
        &self.multi
    }

    /// Whether waypoints are written.
    #[must_use]
    pub const fn sets_waypoint(&self) -> bool {
        self.set_waypoint
    }

    /// Whether waypoints bound the scan.
    #[must_use]
    pub const fn uses_waypoint(&self) -> bool {
        self.use_waypoint
    }

    /// Whether multi-log results are sorted.
    #[must_use]
    pub const fn sorts(&self) -> bool {
        self.sort
    }

    /// Whether debug tracing is on.
    #[must_use]
    pub const fn is_debug(&self) -> bool {
        self.debug
    }

    /// Configured time budget.
    #[must_use]
    pub const fn deadline_value(&self) -> Option<Duration> {
        self.deadline
    }

    /// Checks options that can't be ruled out by their types.
    pub(crate) fn validate(&self) -> CoreResult<()> {
        for name in &self.multi {
            validate_log_name(name).map_err(|e| {
                CoreError::configuration(format!("invalid multi log {name:?}: {e}"))
            })?;
        }
        Ok(())
    }
}
