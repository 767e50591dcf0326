//! Event log benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tallylog_bench::{empty_log, random_keys, seeded_log, BENCH_NOW};
use tallylog_core::{Aggregate, EventLog, EventLogConfig, ManualClock, QueryModifiers};
use tallylog_store::InMemoryStore;

/// Benchmark single-weight appends.
fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    group.throughput(Throughput::Elements(1));

    group.bench_function("weight_1", |b| {
        let log = empty_log("bench");
        b.iter(|| {
            let index = log.append(black_box("event-1")).unwrap();
            black_box(index);
        });
    });

    group.bench_function("weight_7", |b| {
        let log = empty_log("bench");
        b.iter(|| {
            let index = log.append_weighted(black_box("event-1"), 7).unwrap();
            black_box(index);
        });
    });

    group.finish();
}

/// Benchmark full backward scans.
fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for size in [100usize, 1_000, 10_000].iter() {
        let log = seeded_log("bench", &random_keys(*size, 5));
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("full_scan", size), size, |b, _| {
            b.iter(|| {
                let items = log.query(QueryModifiers::new(), None).unwrap();
                black_box(items);
            });
        });
        group.bench_with_input(BenchmarkId::new("limit_50", size), size, |b, _| {
            b.iter(|| {
                let items = log.query(QueryModifiers::new().limit(50), None).unwrap();
                black_box(items);
            });
        });
    }

    group.finish();
}

/// Benchmark compaction of freshly appended runs.
fn bench_compact(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact");

    for distinct in [1u32, 5, 50].iter() {
        let keys = random_keys(1_000, *distinct);
        group.throughput(Throughput::Elements(keys.len() as u64));
        group.bench_with_input(BenchmarkId::new("distinct_keys", distinct), &keys, |b, keys| {
            b.iter_batched(
                || seeded_log("bench", keys),
                |log| {
                    let items = log
                        .query(QueryModifiers::new().aggregate(Aggregate::Full), None)
                        .unwrap();
                    black_box(items);
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Benchmark merged feeds across several logs.
fn bench_multi(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi");
    let names = ["likes", "comments", "views", "shares"];
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(BENCH_NOW));

    let mut writer = EventLog::with_clock(store.clone(), EventLogConfig::default(), clock.clone());
    for name in names {
        writer.select_log(name).unwrap();
        for key in random_keys(500, 5) {
            clock.advance(1);
            writer.append(&key).unwrap();
        }
    }

    for parallel in [false, true] {
        let mut log = EventLog::with_clock(
            store.clone(),
            EventLogConfig::new().parallel_reads(parallel),
            clock.clone(),
        );
        log.select_log(names[0]).unwrap();
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let items = log
                    .query(QueryModifiers::new().multi(names[1..].iter().copied()), None)
                    .unwrap();
                black_box(items);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_append, bench_query, bench_compact, bench_multi);

criterion_main!(benches);
