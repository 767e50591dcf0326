//! Feed command implementation.

use super::{print_items, CommandResult, Settings};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tallylog_core::{Clock, EventLog, ManualClock, QueryModifiers, ScanItem, SystemClock};

/// A merged activity feed.
#[derive(Debug, Serialize)]
pub struct FeedReport {
    /// Logs that were written and queried.
    pub logs: Vec<String>,
    /// Events generated.
    pub events: u64,
    /// Whether each log was aggregated before merging.
    pub aggregated: bool,
    /// The merged feed, newest-first.
    pub feed: Vec<ScanItem>,
}

/// Runs the feed command.
///
/// Events are stamped one second apart so the merged order is visible.
pub fn run(
    settings: &Settings,
    logs: &[String],
    events: u64,
    aggregate: bool,
    limit: Option<u64>,
) -> CommandResult {
    let Some((driver, others)) = logs.split_first() else {
        return Err("at least one log name is required".into());
    };

    let clock = Arc::new(ManualClock::new(SystemClock.now()));
    let mut log = EventLog::with_clock(settings.store(), settings.log_config(), clock.clone());
    let mut rng = rand::thread_rng();

    for _ in 0..events {
        let Some(name) = logs.choose(&mut rng) else {
            break;
        };
        log.select_log(name)?;
        log.append(&format!("{name}-{}", rng.gen_range(1..=5)))?;
        clock.advance(1);
    }

    log.select_log(driver)?;
    let mut modifiers = QueryModifiers::new()
        .multi(others.iter().cloned())
        .aggregate(aggregate);
    if let Some(limit) = limit {
        modifiers = modifiers.limit(limit);
    }
    let feed = log.query(modifiers, None)?;

    let report = FeedReport {
        logs: logs.to_vec(),
        events,
        aggregated: aggregate,
        feed,
    };
    settings.emit(&report, |r| {
        println!(
            "Merged feed of {} ({} events{})",
            r.logs.join(", "),
            r.events,
            if r.aggregated { ", aggregated" } else { "" }
        );
        println!();
        print_items(&r.feed);
    })
}
