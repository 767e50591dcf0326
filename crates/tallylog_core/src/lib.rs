//! # tallylog core
//!
//! Weighted, time-partitioned event logs over a memcached-style key-value
//! store.
//!
//! This crate provides:
//! - Lock-free appends: one atomic increment and one add-if-absent per entry
//! - Backward range scans with limit, offset and waypoint bounds
//! - Duplicate-folding compaction that preserves the slot tiling
//! - Merging several logs into one newest-first feed
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │           EventLog           │  append / query / compact
//! ├──────────────┬───────────────┤
//! │  TimeBucket  │ QueryModifiers│
//! ├──────────────┴───────────────┤
//! │        tallylog_codec        │  CBOR entries, decimal counters
//! ├──────────────────────────────┤
//! │        tallylog_store        │  get / set / add / incr / delete
//! └──────────────────────────────┘
//! ```
//!
//! ## Keys
//!
//! A log named `likes` in day bucket `19675` uses `likes_19675` for its head
//! counter, `likes_19675_<index>` for entry slots and `likes_19675_wp` for
//! its waypoint. Buckets roll over with the clock; old buckets expire with
//! the store's TTLs.
//!
//! ## Example
//!
//! ```rust
//! use tallylog_core::{Aggregate, EventLog, EventLogConfig, QueryModifiers};
//! use tallylog_store::InMemoryStore;
//!
//! let mut log = EventLog::new(InMemoryStore::new(), EventLogConfig::default());
//! log.select_log("likes").unwrap();
//! for key in ["post-1", "post-1", "post-2"] {
//!     log.append(key).unwrap();
//! }
//!
//! let items = log
//!     .query(QueryModifiers::new().aggregate(Aggregate::Full), None)
//!     .unwrap();
//! assert_eq!(items.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bucket;
mod config;
mod error;
mod log;
mod modifiers;
mod stats;
mod types;

pub use bucket::{Clock, Granularity, ManualClock, SystemClock, TimeBucket};
pub use config::{EventLogConfig, SlotTtl};
pub use error::{CoreError, CoreResult};
pub use log::{sort_newest_first, EventLog};
pub use modifiers::{Aggregate, QueryModifiers};
pub use stats::{LogStats, StatsSnapshot};
pub use types::{validate_log_name, Entry, LogName, ScanItem, MAX_LOG_NAME_LEN};
