//! Duplicate folding.
//!
//! A compaction pass walks a newest-first run of entries together with two
//! index cursors. `i` tracks the slot of the entry being visited; `j` tracks
//! where the next merged entry is written. Repeats of a key already held in
//! the accumulator are folded into it and their slot is deleted. Flushing
//! writes the accumulated entries back from `j` downward in first-seen
//! order, so the rewritten slots tile exactly the range the run covered.
//! Once the last generation is flushed, every original slot of the run that
//! no merged entry landed on is deleted, so no stale entry stays readable
//! at an index a later scan could step onto.
//!
//! A waypoint that falls strictly inside one merged entry's interval no
//! longer sits on a slot boundary. It is moved down to that entry's lower
//! end, so the merged entry is handed out again by the next waypoint query
//! rather than skipped.

use super::EventLog;
use crate::error::CoreResult;
use crate::types::{Entry, LogName, ScanItem};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;
use tallylog_codec::to_cbor;
use tallylog_store::KeyValueStore;
use tracing::{debug, warn};

/// An accumulated key and how many entries were folded into it.
struct Group {
    entry: Entry,
    level: u32,
}

/// The accumulator of one generation, in first-seen key order.
#[derive(Default)]
struct Accumulator {
    groups: Vec<Group>,
    positions: HashMap<String, usize>,
}

impl Accumulator {
    fn get_mut(&mut self, key: &str) -> Option<&mut Group> {
        let pos = *self.positions.get(key)?;
        self.groups.get_mut(pos)
    }

    fn push(&mut self, entry: Entry) {
        self.positions.insert(entry.key.clone(), self.groups.len());
        self.groups.push(Group { entry, level: 1 });
    }

    fn take(&mut self) -> Vec<Group> {
        self.positions.clear();
        std::mem::take(&mut self.groups)
    }
}

impl<S: KeyValueStore> EventLog<S> {
    /// Folds repeated keys in `items` and rewrites the run in the store.
    ///
    /// `items` must be a contiguous newest-first scan result whose first
    /// entry sits at `top_index` (defaults to the selected log's head).
    /// `bucket` targets the same log in another bucket. With `max_level`, a
    /// key absorbs at most that many entries before the accumulator is
    /// flushed and a new generation starts.
    ///
    /// Returns the merged entries, newest-first. Runs containing corruption
    /// sentinels are returned unchanged: their slot positions can't be
    /// trusted.
    ///
    /// Compaction never moves the head. Two compactions of the same range
    /// must not run concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LimitedMode`](crate::CoreError::LimitedMode) if
    /// no log is selected, or the store error if a rewrite fails. A failed
    /// rewrite can leave the run partially folded.
    pub fn compact(
        &self,
        items: &[ScanItem],
        top_index: Option<u64>,
        bucket: Option<u64>,
        max_level: Option<NonZeroU32>,
    ) -> CoreResult<Vec<ScanItem>> {
        let current = self.active()?;
        let log = match bucket {
            Some(bucket) if bucket != current.bucket() => current.in_bucket(bucket),
            _ => current.clone(),
        };
        let top = match top_index.or_else(|| self.read_counter(log.storage_name())) {
            Some(top) if top > 0 => top,
            _ => {
                debug!(log = %log, "nothing to compact");
                return Ok(items.to_vec());
            }
        };
        self.compact_run(&log, items, top, max_level)
    }

    /// Compacts a scanned run, keeping it as-is if the rewrite fails.
    pub(super) fn compact_or_keep(
        &self,
        log: &LogName,
        items: Vec<ScanItem>,
        top: u64,
        max_level: Option<NonZeroU32>,
    ) -> Vec<ScanItem> {
        match self.compact_run(log, &items, top, max_level) {
            Ok(compacted) => compacted,
            Err(err) => {
                warn!(log = %log, top, error = %err, "compaction failed, returning raw entries");
                items
            }
        }
    }

    pub(super) fn compact_run(
        &self,
        log: &LogName,
        items: &[ScanItem],
        top: u64,
        max_level: Option<NonZeroU32>,
    ) -> CoreResult<Vec<ScanItem>> {
        if let Some(index) = items.iter().find_map(|item| match item {
            ScanItem::Corrupted { index } => Some(*index),
            ScanItem::Entry(_) => None,
        }) {
            warn!(log = %log, index, "run has missing slots, not compacting");
            return Ok(items.to_vec());
        }

        let mut acc = Accumulator::default();
        let mut completed = Vec::with_capacity(items.len());
        let mut kept = Vec::new();
        let mut written = HashSet::new();
        let mut i = top;
        let mut j = top;
        let mut folds = 0u64;

        for entry in items.iter().filter_map(ScanItem::as_entry) {
            let full = acc
                .get_mut(&entry.key)
                .is_some_and(|group| max_level.is_some_and(|max| group.level >= max.get()));
            if full {
                j = self.flush(log, acc.take(), &mut completed, &mut written, j)?;
            }

            match acc.get_mut(&entry.key) {
                Some(group) => {
                    group.entry.weight += entry.weight;
                    group.level += 1;
                    self.store.delete(&log.slot_key(i))?;
                    folds += 1;
                }
                None => {
                    acc.push(entry.clone());
                    kept.push(i);
                }
            }
            i = i.saturating_sub(entry.weight);
        }
        self.flush(log, acc.take(), &mut completed, &mut written, j)?;

        let mut stale = 0usize;
        for index in kept.into_iter().filter(|index| !written.contains(index)) {
            self.store.delete(&log.slot_key(index))?;
            stale += 1;
        }
        self.realign_waypoint(log, &completed, top);

        self.stats.record_compaction(folds);
        debug!(log = %log, top, folds, stale, entries = completed.len(), "compacted run");
        Ok(completed)
    }

    /// Moves the waypoint of `log` onto a slot boundary of the rewritten run.
    fn realign_waypoint(&self, log: &LogName, completed: &[ScanItem], top: u64) {
        let Some(waypoint) = self.read_counter(&log.waypoint_key()) else {
            return;
        };
        let mut upper = top;
        for entry in completed.iter().filter_map(ScanItem::as_entry) {
            let lower = upper.saturating_sub(entry.weight);
            if lower < waypoint && waypoint < upper {
                if let Err(err) = self.write_waypoint(log, lower) {
                    warn!(log = %log, waypoint, error = %err, "waypoint realign failed");
                }
                return;
            }
            upper = lower;
        }
    }

    /// Writes merged entries downward from `cursor`, returning the next free
    /// position.
    fn flush(
        &self,
        log: &LogName,
        groups: Vec<Group>,
        completed: &mut Vec<ScanItem>,
        written: &mut HashSet<u64>,
        mut cursor: u64,
    ) -> CoreResult<u64> {
        for Group { entry, .. } in groups {
            let record = to_cbor(&entry)?;
            self.store
                .set(&log.slot_key(cursor), &record, Some(self.expiry))?;
            written.insert(cursor);
            cursor = cursor.saturating_sub(entry.weight);
            completed.push(ScanItem::Entry(entry));
        }
        Ok(cursor)
    }
}
