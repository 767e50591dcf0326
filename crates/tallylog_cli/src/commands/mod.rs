//! CLI command implementations.

pub mod compact;
pub mod feed;
pub mod insert;
pub mod stress;

use clap::ValueEnum;
use serde::Serialize;
use tallylog_core::{EventLogConfig, Granularity, ScanItem};
use tallylog_store::{InMemoryStore, PrefixedStore, StoreConfig};

/// Result type shared by all commands.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// How reports are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Key prefix for the store.
    pub prefix: String,
    /// Bucket length.
    pub granularity: Granularity,
    /// Report format.
    pub format: OutputFormat,
}

impl Settings {
    /// Creates the store commands run against.
    pub fn store(&self) -> PrefixedStore<InMemoryStore> {
        PrefixedStore::new(
            InMemoryStore::new(),
            StoreConfig::new().key_prefix(self.prefix.clone()),
        )
    }

    /// Event log configuration for this run.
    pub fn log_config(&self) -> EventLogConfig {
        EventLogConfig::new().granularity(self.granularity)
    }

    /// Prints `report` as JSON, or hands it to `text` for plain output.
    pub fn emit<T: Serialize>(&self, report: &T, text: impl FnOnce(&T)) -> CommandResult {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
            OutputFormat::Text => text(report),
        }
        Ok(())
    }
}

/// Prints scan results as a table.
pub fn print_items(items: &[ScanItem]) {
    println!("  {:<12} {:<24} {:>8}", "TIME", "KEY", "WEIGHT");
    for item in items {
        match item {
            ScanItem::Entry(entry) => {
                println!(
                    "  {:<12} {:<24} {:>8}",
                    entry.timestamp, entry.key, entry.weight
                );
            }
            ScanItem::Corrupted { index } => {
                println!("  {:<12} {:<24} {:>8}", "-", format!("<missing slot {index}>"), 1);
            }
        }
    }
}
