//! Property tests for the slot tiling and compaction invariants.

use std::sync::Arc;

use proptest::prelude::*;
use tallylog_core::{Aggregate, EventLog, EventLogConfig, ManualClock, QueryModifiers, ScanItem};
use tallylog_store::InMemoryStore;

fn fresh_log() -> EventLog<InMemoryStore> {
    let mut log = EventLog::with_clock(
        InMemoryStore::new(),
        EventLogConfig::default(),
        Arc::new(ManualClock::new(1_700_000_000)),
    );
    log.select_log("prop").unwrap();
    log
}

fn total_weight(items: &[ScanItem]) -> u64 {
    items.iter().map(ScanItem::weight).sum()
}

/// Keys from a small alphabet so runs contain plenty of repeats.
fn events_strategy() -> impl Strategy<Value = Vec<(String, u64)>> {
    prop::collection::vec(("[a-d]", 1u64..6), 1..40)
}

proptest! {
    #[test]
    fn slot_indices_are_prefix_sums(weights in prop::collection::vec(1u64..10, 1..50)) {
        let log = fresh_log();
        let mut sum = 0;
        for (n, weight) in weights.iter().enumerate() {
            sum += weight;
            prop_assert_eq!(log.append_weighted(&format!("e{n}"), *weight).unwrap(), sum);
        }
        prop_assert_eq!(log.head(), Some(sum));

        let items = log.query(QueryModifiers::new(), None).unwrap();
        prop_assert_eq!(items.len(), weights.len());
        let keys: Vec<String> = items
            .into_iter()
            .filter_map(ScanItem::into_entry)
            .map(|e| e.key)
            .collect();
        let expected: Vec<String> = (0..weights.len()).rev().map(|n| format!("e{n}")).collect();
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn aggregation_preserves_total_weight(events in events_strategy(), level in 0u32..4) {
        let log = fresh_log();
        for (key, weight) in &events {
            log.append_weighted(key, *weight).unwrap();
        }
        let raw = log.query(QueryModifiers::new(), None).unwrap();
        let aggregate = if level == 0 { Aggregate::Full } else { Aggregate::from(level) };
        let folded = log
            .query(QueryModifiers::new().aggregate(aggregate), None)
            .unwrap();

        prop_assert_eq!(total_weight(&folded), total_weight(&raw));
        prop_assert!(folded.len() <= raw.len());

        // the rewritten slots read back exactly as returned
        let reread = log.query(QueryModifiers::new(), None).unwrap();
        prop_assert_eq!(reread, folded);
    }

    #[test]
    fn compaction_is_idempotent(events in events_strategy()) {
        let log = fresh_log();
        for (key, weight) in &events {
            log.append_weighted(key, *weight).unwrap();
        }
        let raw = log.query(QueryModifiers::new(), None).unwrap();
        let once = log.compact(&raw, None, None, None).unwrap();
        let folds = log.stats().snapshot().folds;

        let again = log.query(QueryModifiers::new(), None).unwrap();
        let twice = log.compact(&again, None, None, None).unwrap();
        prop_assert_eq!(&twice, &once);
        prop_assert_eq!(log.stats().snapshot().folds, folds);
    }

    #[test]
    fn waypoint_queries_never_repeat(first in 1usize..20, second in 0usize..20) {
        let log = fresh_log();
        for n in 0..first {
            log.append(&format!("old{n}")).unwrap();
        }
        let seen = log
            .query(QueryModifiers::new().set_waypoint(true), None)
            .unwrap();
        prop_assert_eq!(seen.len(), first);
        let mark = log.waypoint().unwrap();

        for n in 0..second {
            log.append(&format!("new{n}")).unwrap();
        }
        let fresh = log
            .query(QueryModifiers::new().use_waypoint(true), None)
            .unwrap();
        prop_assert_eq!(fresh.len(), second);
        prop_assert!(fresh
            .iter()
            .filter_map(ScanItem::as_entry)
            .all(|e| e.key.starts_with("new")));
        prop_assert_eq!(mark, first as u64);
    }
}
