//! Backward scanning and the query pipeline.

use super::merge::merge_feeds;
use super::EventLog;
use crate::error::CoreResult;
use crate::modifiers::QueryModifiers;
use crate::types::{LogName, ScanItem};
use std::time::Instant;
use tallylog_store::KeyValueStore;
use tracing::{debug, warn};

/// Bounds of one backward scan over `(lower, upper]`.
#[derive(Debug, Clone, Copy)]
struct ScanRange {
    upper: u64,
    lower: u64,
    limit: u64,
    offset: u64,
    deadline: Option<Instant>,
}

impl<S: KeyValueStore> EventLog<S> {
    /// Runs a query over the selected log and any `multi` logs.
    ///
    /// `upper_bound` overrides the selected log's head as the scan start
    /// (logs named in `multi` always start at their own head). The
    /// modifiers are consumed; the next query starts from defaults.
    ///
    /// Per log, entries come back newest-first. Missing slots appear in-line
    /// as [`ScanItem::Corrupted`]. With `multi`, results are concatenated in
    /// scan order and, unless `sort(false)`, stably sorted newest-first;
    /// `reverse` is applied last.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a `multi` name is invalid. Store
    /// failures never fail a query: reads degrade to absent and failed
    /// compaction or waypoint writes are logged.
    pub fn query(&self, modifiers: QueryModifiers, upper_bound: Option<u64>) -> CoreResult<Vec<ScanItem>> {
        modifiers.validate()?;
        let deadline = modifiers.deadline_value().map(|budget| Instant::now() + budget);

        let mut targets: Vec<(LogName, Option<u64>)> = Vec::new();
        if let Some(log) = &self.current {
            targets.push((log.clone(), upper_bound));
        }
        for name in modifiers.multi_names() {
            targets.push((self.sibling(name)?, None));
        }

        let feeds: Vec<Vec<ScanItem>> = if self.config.parallel_reads && targets.len() > 1 {
            std::thread::scope(|scope| {
                let handles: Vec<_> = targets
                    .iter()
                    .map(|(log, upper)| {
                        let modifiers = &modifiers;
                        scope.spawn(move || self.query_log(log, *upper, modifiers, deadline))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| match handle.join() {
                        Ok(items) => items,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect()
            })
        } else {
            targets
                .iter()
                .map(|(log, upper)| self.query_log(log, *upper, &modifiers, deadline))
                .collect()
        };

        let sort = !modifiers.multi_names().is_empty() && modifiers.sorts();
        let mut items = merge_feeds(feeds, sort);
        if modifiers.is_reversed() {
            items.reverse();
        }
        Ok(items)
    }

    /// Runs the per-log part of a query.
    fn query_log(
        &self,
        log: &LogName,
        upper_bound: Option<u64>,
        modifiers: &QueryModifiers,
        deadline: Option<Instant>,
    ) -> Vec<ScanItem> {
        let started = Instant::now();
        let upper = upper_bound
            .filter(|&upper| upper > 0)
            .or_else(|| self.read_counter(log.storage_name()))
            .unwrap_or(0);
        if upper == 0 {
            return Vec::new();
        }

        let waypoint = if modifiers.uses_waypoint() {
            self.read_counter(&log.waypoint_key())
        } else {
            None
        };
        let aggregate = modifiers.aggregate_value();
        let compact_now = aggregate.is_enabled() && !modifiers.uses_waypoint();

        let range = ScanRange {
            upper,
            lower: waypoint.unwrap_or(0),
            limit: modifiers.limit_value().unwrap_or(upper),
            // offset is applied after compaction so slot positions line up
            offset: if compact_now { 0 } else { modifiers.offset_value() },
            deadline,
        };
        let mut items = self.scan(log, range);

        if compact_now {
            items = self.compact_or_keep(log, items, upper, aggregate.max_level());
            let skip = usize::try_from(modifiers.offset_value()).unwrap_or(usize::MAX);
            items = items.into_iter().skip(skip).collect();
        }

        if modifiers.sets_waypoint() {
            if let Err(err) = self.write_waypoint(log, upper) {
                warn!(log = %log, error = %err, "waypoint write failed");
            }
        }

        if aggregate.is_enabled() && modifiers.uses_waypoint() {
            // Only the slice below the previous waypoint is compacted: it was
            // handed out by an earlier pass and no longer changes.
            match waypoint {
                Some(top) if top > 0 => {
                    let slice = self.scan(
                        log,
                        ScanRange {
                            upper: top,
                            lower: 0,
                            limit: top,
                            offset: 0,
                            deadline,
                        },
                    );
                    self.compact_or_keep(log, slice, top, aggregate.max_level());
                }
                _ => debug!(log = %log, "no waypoint yet, deferred compaction skipped"),
            }
        }

        if modifiers.is_debug() {
            debug!(
                log = %log,
                upper,
                lower = range.lower,
                items = items.len(),
                corrupted = items.iter().filter(|i| i.is_corrupted()).count(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "scan finished"
            );
        }
        items
    }

    /// Walks backward from `range.upper`, stepping by each entry's weight.
    fn scan(&self, log: &LogName, range: ScanRange) -> Vec<ScanItem> {
        let mut items = Vec::new();
        let mut cursor = range.upper;
        let mut emitted = 0u64;
        let mut to_skip = range.offset;

        while cursor > range.lower && emitted < range.limit {
            if range.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(log = %log, cursor, "scan deadline reached, returning partial result");
                break;
            }

            let step = match self.read_slot(log, cursor) {
                Some(entry) => {
                    let weight = entry.weight;
                    if to_skip > 0 {
                        to_skip -= 1;
                    } else {
                        items.push(ScanItem::Entry(entry));
                        emitted += 1;
                    }
                    weight
                }
                None => {
                    self.stats.record_corrupted_slot();
                    items.push(ScanItem::Corrupted { index: cursor });
                    1
                }
            };
            cursor = cursor.saturating_sub(step);
        }

        items
    }
}
