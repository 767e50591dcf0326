//! Error types for the tallylog engine.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in tallylog core operations.
///
/// Missing slots found while scanning are not errors: they are reported
/// in-line as [`ScanItem::Corrupted`](crate::ScanItem::Corrupted). Two
/// callers compacting the same range at once can interleave their rewrites;
/// that race is neither detected nor prevented here.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Key-value store error.
    #[error("store error: {0}")]
    Store(#[from] tallylog_store::StoreError),

    /// Record or counter codec error.
    #[error("codec error: {0}")]
    Codec(#[from] tallylog_codec::CodecError),

    /// Invalid granularity, log name or query option.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// An append could not be completed.
    #[error("append to {log} failed: {reason}")]
    AppendFailed {
        /// Storage name of the log.
        log: String,
        /// Why the append failed.
        reason: String,
    },

    /// No valid log is selected, so mutating operations are unavailable.
    #[error("no valid log selected; handle is in limited mode")]
    LimitedMode,
}

impl CoreError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an append failed error.
    pub fn append_failed(log: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AppendFailed {
            log: log.into(),
            reason: reason.into(),
        }
    }
}
