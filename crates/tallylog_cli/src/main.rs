//! tallylog CLI
//!
//! Drivers that exercise tallylog event logs against an in-memory store.
//!
//! # Commands
//!
//! - `insert` - Append a few random events and print the aggregated log
//! - `stress` - Append many events from several threads and report throughput
//! - `feed` - Spread events over several logs and print the merged feed
//! - `compact` - Seed a log, run waypoint compaction and report what it folded

mod commands;

use clap::{Parser, Subcommand};
use commands::{OutputFormat, Settings};
use tallylog_core::Granularity;
use tracing_subscriber::EnvFilter;

/// Event log drivers for tallylog.
#[derive(Parser)]
#[command(name = "tallylog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Prefix prepended to every store key
    #[arg(global = true, long, default_value = "")]
    prefix: String,

    /// Bucket length (hour, day, week, month, year)
    #[arg(global = true, short, long, default_value = "day")]
    granularity: Granularity,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append random events to one log, then print it aggregated
    Insert {
        /// Log to append to
        #[arg(short, long, default_value = "test_struct")]
        log: String,

        /// Number of events to append
        #[arg(short, long, default_value = "5")]
        count: u64,

        /// Number of distinct event keys
        #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
        keys: u32,
    },

    /// Append many events concurrently and report throughput
    Stress {
        /// Log to append to
        #[arg(short, long, default_value = "test_structure")]
        log: String,

        /// Total number of events to append
        #[arg(short, long, default_value = "50000")]
        count: u64,

        /// Number of appending threads
        #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u32).range(1..))]
        threads: u32,
    },

    /// Spread events over several logs and print the merged feed
    Feed {
        /// Logs to write to; the first one drives the query
        #[arg(long, value_delimiter = ',', default_value = "likes,comments,views")]
        logs: Vec<String>,

        /// Number of events to generate
        #[arg(short, long, default_value = "15")]
        events: u64,

        /// Fold repeated events in each log
        #[arg(short, long)]
        aggregate: bool,

        /// Maximum entries per log
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Seed a log and fold it with waypoint compaction
    Compact {
        /// Log to compact
        #[arg(short, long, default_value = "test_structure")]
        log: String,

        /// Number of events to seed
        #[arg(short, long, default_value = "5000")]
        count: u64,

        /// Number of distinct event keys
        #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
        keys: u32,

        /// Fold at most this many entries per key in one generation
        #[arg(short, long)]
        max_level: Option<u32>,

        /// Number of entries to print after compaction
        #[arg(short, long, default_value = "50")]
        sample: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings {
        prefix: cli.prefix,
        granularity: cli.granularity,
        format: cli.format,
    };

    match cli.command {
        Commands::Insert { log, count, keys } => {
            commands::insert::run(&settings, &log, count, keys)?;
        }
        Commands::Stress {
            log,
            count,
            threads,
        } => {
            commands::stress::run(&settings, &log, count, threads)?;
        }
        Commands::Feed {
            logs,
            events,
            aggregate,
            limit,
        } => {
            commands::feed::run(&settings, &logs, events, aggregate, limit)?;
        }
        Commands::Compact {
            log,
            count,
            keys,
            max_level,
            sample,
        } => {
            commands::compact::run(&settings, &log, count, keys, max_level, sample)?;
        }
    }

    Ok(())
}
