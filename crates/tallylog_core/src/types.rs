//! Core type definitions for tallylog.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest accepted log name, in bytes.
///
/// Leaves room in a 250-byte cache key for the prefix, bucket and index.
pub const MAX_LOG_NAME_LEN: usize = 200;

/// One record in a log.
///
/// The weight is both the record's magnitude (how many events it stands
/// for) and the width of the index interval its slot covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Caller-supplied event key.
    pub key: String,
    /// Number of events this record stands for (at least 1).
    pub weight: u64,
    /// Unix seconds at which the event (or the newest folded event) was appended.
    pub timestamp: u64,
}

impl Entry {
    /// Creates an entry.
    pub fn new(key: impl Into<String>, weight: u64, timestamp: u64) -> Self {
        Self {
            key: key.into(),
            weight,
            timestamp,
        }
    }
}

/// One position reported by a backward scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanItem {
    /// A readable entry.
    Entry(Entry),
    /// The slot at `index` was expected but missing or unreadable.
    Corrupted {
        /// Index of the missing slot.
        index: u64,
    },
}

impl ScanItem {
    /// Returns the entry, if this item is one.
    #[must_use]
    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::Corrupted { .. } => None,
        }
    }

    /// Consumes the item, returning the entry if this item is one.
    #[must_use]
    pub fn into_entry(self) -> Option<Entry> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::Corrupted { .. } => None,
        }
    }

    /// Returns true for corruption sentinels.
    #[must_use]
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }

    /// Timestamp used when merging feeds; sentinels sort as the oldest.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.as_entry().map_or(0, |e| e.timestamp)
    }

    /// Weight of the item; a sentinel covers a single index.
    #[must_use]
    pub fn weight(&self) -> u64 {
        self.as_entry().map_or(1, |e| e.weight)
    }
}

impl From<Entry> for ScanItem {
    fn from(entry: Entry) -> Self {
        Self::Entry(entry)
    }
}

/// A log name pinned to one time bucket.
///
/// Determines every store key the log uses:
///
/// ```text
/// <name>_<bucket>          head counter
/// <name>_<bucket>_<index>  entry slot
/// <name>_<bucket>_wp       waypoint
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogName {
    base: String,
    bucket: u64,
    storage_name: String,
}

impl LogName {
    /// Creates a log name, validating `base`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `base` is not a valid log name.
    pub fn new(base: impl Into<String>, bucket: u64) -> CoreResult<Self> {
        let base = base.into();
        validate_log_name(&base)?;
        let storage_name = format!("{base}_{bucket}");
        Ok(Self {
            base,
            bucket,
            storage_name,
        })
    }

    /// Returns the caller-facing name.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the bucket identifier.
    #[must_use]
    pub const fn bucket(&self) -> u64 {
        self.bucket
    }

    /// Returns the same log in another bucket.
    #[must_use]
    pub fn in_bucket(&self, bucket: u64) -> Self {
        Self {
            base: self.base.clone(),
            bucket,
            storage_name: format!("{}_{bucket}", self.base),
        }
    }

    /// Key of the head counter.
    #[must_use]
    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    /// Key of the slot at `index`.
    #[must_use]
    pub fn slot_key(&self, index: u64) -> String {
        format!("{}_{index}", self.storage_name)
    }

    /// Key of the waypoint.
    #[must_use]
    pub fn waypoint_key(&self) -> String {
        format!("{}_wp", self.storage_name)
    }
}

impl fmt::Display for LogName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_name)
    }
}

/// Checks that `name` can be used as a log name.
///
/// Names must be non-empty, at most [`MAX_LOG_NAME_LEN`] bytes, and free of
/// whitespace and control characters (they become part of cache keys).
///
/// # Errors
///
/// Returns a configuration error describing the first violated rule.
pub fn validate_log_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::configuration("log name is empty"));
    }
    if name.len() > MAX_LOG_NAME_LEN {
        return Err(CoreError::configuration(format!(
            "log name is {} bytes, limit is {MAX_LOG_NAME_LEN}",
            name.len()
        )));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CoreError::configuration(format!(
            "log name {name:?} contains whitespace or control characters"
        )));
    }
    Ok(())
}
