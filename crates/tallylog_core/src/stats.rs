//! Event log statistics.
//!
//! Counters are per handle, atomic, and monotonically increasing.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one [`EventLog`](crate::EventLog) handle.
#[derive(Debug, Default)]
pub struct LogStats {
    appends: AtomicU64,
    append_failures: AtomicU64,
    slots_read: AtomicU64,
    corrupted_slots: AtomicU64,
    folds: AtomicU64,
    compactions: AtomicU64,
}

impl LogStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_append(&self) {
        self.appends.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_append_failure(&self) {
        self.append_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_slot_read(&self) {
        self.slots_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_corrupted_slot(&self) {
        self.corrupted_slots.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compaction(&self, folds: u64) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
        self.folds.fetch_add(folds, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            appends: self.appends.load(Ordering::Relaxed),
            append_failures: self.append_failures.load(Ordering::Relaxed),
            slots_read: self.slots_read.load(Ordering::Relaxed),
            corrupted_slots: self.corrupted_slots.load(Ordering::Relaxed),
            folds: self.folds.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
        }
    }
}

/// A snapshot of [`LogStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Successful appends.
    pub appends: u64,
    /// Appends that returned an error.
    pub append_failures: u64,
    /// Slot reads issued by scans.
    pub slots_read: u64,
    /// Corruption sentinels emitted by scans.
    pub corrupted_slots: u64,
    /// Entries folded into another by compaction.
    pub folds: u64,
    /// Compaction passes run.
    pub compactions: u64,
}
