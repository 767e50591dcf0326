//! Key-value store trait definition.

use crate::error::StoreResult;
use std::sync::Arc;
use std::time::Duration;

/// Longest key a store must accept, in bytes.
///
/// Matches the memcached protocol limit so the same key layout works against
/// a networked cache.
pub const MAX_KEY_LEN: usize = 250;

/// A key-value store offering the primitives tallylog builds on.
///
/// Stores are **opaque caches**. The only value they interpret is the decimal
/// ASCII counter manipulated by [`increment`](KeyValueStore::increment).
///
/// # Invariants
///
/// - `get` returns `Ok(None)` for absent keys, never a placeholder value
/// - `add` and `increment` are atomic per key
/// - `add` never overwrites, `increment` never creates
/// - A `ttl` of `None` means "use the store's default expiry"
/// - Backend outages surface as [`StoreError::Unavailable`](crate::StoreError::Unavailable)
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::PrefixedStore`] - Namespacing wrapper
/// - [`super::RetryingStore`] - Retry wrapper
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Stores `value` at `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable or rejects the key.
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()>;

    /// Stores `value` at `key` only if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`](crate::StoreError::AlreadyExists)
    /// if the key is present, or an error if the backend is unavailable.
    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()>;

    /// Atomically adds `amount` to the decimal counter at `key`.
    ///
    /// Returns the new counter value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if the
    /// key is absent, [`StoreError::NotNumeric`](crate::StoreError::NotNumeric)
    /// if the value is not a counter,
    /// [`StoreError::Overflow`](crate::StoreError::Overflow) if the sum would
    /// pass `u64::MAX`, or an error if the backend is unavailable. Backends
    /// whose native counters wrap may return the wrapped value instead.
    fn increment(&self, key: &str, amount: u64) -> StoreResult<u64>;

    /// Removes `key`.
    ///
    /// Returns whether a value was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Removes every key in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable.
    fn flush_all(&self) -> StoreResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        (**self).set(key, value, ttl)
    }

    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        (**self).add(key, value, ttl)
    }

    fn increment(&self, key: &str, amount: u64) -> StoreResult<u64> {
        (**self).increment(key, amount)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        (**self).delete(key)
    }

    fn flush_all(&self) -> StoreResult<()> {
        (**self).flush_all()
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        (**self).set(key, value, ttl)
    }

    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        (**self).add(key, value, ttl)
    }

    fn increment(&self, key: &str, amount: u64) -> StoreResult<u64> {
        (**self).increment(key, amount)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        (**self).delete(key)
    }

    fn flush_all(&self) -> StoreResult<()> {
        (**self).flush_all()
    }
}
