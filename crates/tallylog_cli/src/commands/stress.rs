//! Stress command implementation.

use super::{CommandResult, Settings};
use rand::Rng;
use serde::Serialize;
use std::thread;
use std::time::Instant;
use tallylog_core::EventLog;
use tracing::warn;

/// Result of a stress run.
#[derive(Debug, Clone, Serialize)]
pub struct StressReport {
    /// Storage name of the log.
    pub log: String,
    /// Appending threads.
    pub threads: u32,
    /// Appends attempted.
    pub total_ops: u64,
    /// Appends that succeeded.
    pub successful_ops: u64,
    /// Appends that failed.
    pub failed_ops: u64,
    /// Head counter after the run.
    pub head: Option<u64>,
    /// Wall-clock time in milliseconds.
    pub duration_ms: u128,
    /// Appends per second.
    pub ops_per_second: f64,
}

impl StressReport {
    fn print_summary(&self) {
        println!("=== stress {} ===", self.log);
        println!("Threads:          {}", self.threads);
        println!("Total operations: {}", self.total_ops);
        println!("Successful:       {}", self.successful_ops);
        println!("Failed:           {}", self.failed_ops);
        match self.head {
            Some(head) => println!("Head:             {head}"),
            None => println!("Head:             (none)"),
        }
        println!("Duration:         {} ms", self.duration_ms);
        println!("Throughput:       {:.2} ops/sec", self.ops_per_second);
    }
}

/// Runs the stress command.
pub fn run(settings: &Settings, log_name: &str, count: u64, threads: u32) -> CommandResult {
    let store = settings.store();
    let mut reader = EventLog::new(&store, settings.log_config());
    reader.select_log(log_name)?;

    let per_thread = count / u64::from(threads);
    let remainder = count % u64::from(threads);
    let start = Instant::now();

    let outcomes: Vec<(u64, u64)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..u64::from(threads))
            .map(|t| {
                let store = &store;
                let ops = per_thread + u64::from(t < remainder);
                scope.spawn(move || {
                    let mut log = EventLog::new(store, settings.log_config());
                    if log.select_log(log_name).is_err() {
                        return (0, ops);
                    }
                    let mut rng = rand::thread_rng();
                    let (mut ok, mut failed) = (0, 0);
                    for _ in 0..ops {
                        match log.append(&format!("somedata-{}", rng.gen_range(1..=5))) {
                            Ok(_) => ok += 1,
                            Err(err) => {
                                warn!(thread = t, error = %err, "append failed");
                                failed += 1;
                            }
                        }
                    }
                    (ok, failed)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or((0, 0)))
            .collect()
    });

    let duration = start.elapsed();
    let successful_ops: u64 = outcomes.iter().map(|(ok, _)| ok).sum();
    let failed_ops: u64 = outcomes.iter().map(|(_, failed)| failed).sum();
    let ops_per_second = if duration.as_secs_f64() > 0.0 {
        (successful_ops + failed_ops) as f64 / duration.as_secs_f64()
    } else {
        0.0
    };

    let report = StressReport {
        log: reader.storage_name().unwrap_or(log_name).to_string(),
        threads,
        total_ops: successful_ops + failed_ops,
        successful_ops,
        failed_ops,
        head: reader.head(),
        duration_ms: duration.as_millis(),
        ops_per_second,
    };
    settings.emit(&report, StressReport::print_summary)
}
