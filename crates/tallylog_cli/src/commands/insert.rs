//! Insert command implementation.

use super::{print_items, CommandResult, Settings};
use rand::Rng;
use serde::Serialize;
use tallylog_core::{Aggregate, EventLog, QueryModifiers, ScanItem};

/// What an insert run produced.
#[derive(Debug, Serialize)]
pub struct InsertReport {
    /// Storage name of the log.
    pub log: String,
    /// Index returned by the last append.
    pub last_index: u64,
    /// The log after aggregation, newest-first.
    pub entries: Vec<ScanItem>,
}

/// Runs the insert command.
pub fn run(settings: &Settings, log_name: &str, count: u64, keys: u32) -> CommandResult {
    let mut log = EventLog::new(settings.store(), settings.log_config());
    log.select_log(log_name)?;

    let mut rng = rand::thread_rng();
    let mut last_index = 0;
    for _ in 0..count {
        last_index = log.append(&format!("somedata-{}", rng.gen_range(1..=keys)))?;
    }

    let entries = log.query(QueryModifiers::new().aggregate(Aggregate::Full), None)?;
    let report = InsertReport {
        log: log.storage_name().unwrap_or(log_name).to_string(),
        last_index,
        entries,
    };

    settings.emit(&report, |r| {
        println!("Inserted {} events into {}", count, r.log);
        println!("Index of last insert: {}", r.last_index);
        println!();
        println!("Aggregated log:");
        print_items(&r.entries);
    })
}
