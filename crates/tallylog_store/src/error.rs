//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Why the backend is unreachable.
        reason: String,
    },

    /// `increment` was called on a key that does not exist.
    #[error("key not found: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// `add` was called on a key that already exists.
    #[error("key already exists: {key}")]
    AlreadyExists {
        /// The existing key.
        key: String,
    },

    /// `increment` was called on a value that is not a decimal counter.
    #[error("value at {key} is not a numeric counter")]
    NotNumeric {
        /// The key holding the non-numeric value.
        key: String,
    },

    /// `increment` would push the counter past `u64::MAX`.
    #[error("counter at {key} would overflow")]
    Overflow {
        /// The saturated counter's key.
        key: String,
    },

    /// The key cannot be stored by this backend.
    #[error("invalid key: {key:?}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates an already exists error.
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    /// Returns true if the error means the backend itself is unreachable.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
