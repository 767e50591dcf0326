//! Benchmark utilities.

use rand::Rng;
use std::sync::Arc;
use tallylog_core::{EventLog, EventLogConfig, ManualClock};
use tallylog_store::InMemoryStore;

/// Fixed time for benchmark logs, so every run uses the same bucket.
pub const BENCH_NOW: u64 = 1_700_000_000;

/// Generate `count` event keys drawn from `distinct` values.
pub fn random_keys(count: usize, distinct: u32) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| format!("event-{}", rng.gen_range(1..=distinct.max(1))))
        .collect()
}

/// Open an empty log named `name` over a fresh in-memory store.
pub fn empty_log(name: &str) -> EventLog<InMemoryStore> {
    let mut log = EventLog::with_clock(
        InMemoryStore::new(),
        EventLogConfig::default(),
        Arc::new(ManualClock::new(BENCH_NOW)),
    );
    log.select_log(name).expect("valid bench log name");
    log
}

/// Open a log pre-filled with the given keys, one weight each.
pub fn seeded_log(name: &str, keys: &[String]) -> EventLog<InMemoryStore> {
    let log = empty_log(name);
    for key in keys {
        log.append(key).expect("append to in-memory store");
    }
    log
}
