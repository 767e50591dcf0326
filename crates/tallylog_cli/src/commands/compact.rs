//! Compact command implementation.

use super::{print_items, CommandResult, Settings};
use rand::Rng;
use serde::Serialize;
use std::time::Instant;
use tallylog_core::{Aggregate, EventLog, QueryModifiers, ScanItem, StatsSnapshot};

/// Compaction statistics.
#[derive(Debug, Serialize)]
pub struct CompactReport {
    /// Storage name of the log.
    pub log: String,
    /// Slots before compaction.
    pub slots_before: usize,
    /// Slots reachable by a scan afterwards.
    pub slots_after: usize,
    /// Total weight of the log, unchanged by compaction.
    pub total_weight: u64,
    /// Time spent in the compacting passes, in milliseconds.
    pub duration_ms: u128,
    /// Handle counters at the end of the run.
    pub stats: StatsSnapshot,
    /// The newest entries after compaction.
    pub sample: Vec<ScanItem>,
}

/// Runs the compact command.
///
/// The first pass only records a waypoint; the second folds everything
/// below it, the way a periodic job would.
pub fn run(
    settings: &Settings,
    log_name: &str,
    count: u64,
    keys: u32,
    max_level: Option<u32>,
    sample: u64,
) -> CommandResult {
    let mut log = EventLog::new(settings.store(), settings.log_config());
    log.select_log(log_name)?;

    let mut rng = rand::thread_rng();
    for _ in 0..count {
        log.append(&format!("somedata-{}", rng.gen_range(1..=keys)))?;
    }
    let slots_before = log.query(QueryModifiers::new(), None)?.len();

    let aggregate = max_level.map_or(Aggregate::Full, Aggregate::from);
    let pass = || {
        QueryModifiers::new()
            .set_waypoint(true)
            .use_waypoint(true)
            .aggregate(aggregate)
    };
    let start = Instant::now();
    log.query(pass(), None)?;
    log.query(pass(), None)?;
    let duration = start.elapsed();

    let after = log.query(QueryModifiers::new(), None)?;
    let report = CompactReport {
        log: log.storage_name().unwrap_or(log_name).to_string(),
        slots_before,
        slots_after: after.len(),
        total_weight: after.iter().map(ScanItem::weight).sum(),
        duration_ms: duration.as_millis(),
        stats: log.stats().snapshot(),
        sample: log.query(QueryModifiers::new().limit(sample), None)?,
    };

    settings.emit(&report, |r| {
        println!("Compacting {}", r.log);
        println!();
        println!("Compaction Analysis:");
        println!("  Slots before:  {}", r.slots_before);
        println!("  Slots after:   {}", r.slots_after);
        println!("  Total weight:  {}", r.total_weight);
        println!("  Folds:         {}", r.stats.folds);
        println!("  Ran in:        {} ms", r.duration_ms);
        println!();
        println!("Newest entries:");
        print_items(&r.sample);
    })
}
