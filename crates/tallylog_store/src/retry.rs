//! Retry wrapper for stores that can be temporarily unreachable.

use crate::backend::KeyValueStore;
use crate::error::StoreResult;
use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add up to 25% random jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a retry configuration with `max_attempts` attempts.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            let jitter = delay_secs * 0.25 * rand::thread_rng().gen::<f64>();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// A store wrapper that retries operations failing with
/// [`StoreError::Unavailable`](crate::StoreError::Unavailable).
///
/// Every other error (`NotFound`, `AlreadyExists`, ...) is a definite answer
/// from the backend and is returned immediately.
///
/// Only wrap backends whose `Unavailable` guarantees the operation was not
/// applied; otherwise a retried `increment` may count twice.
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: KeyValueStore> RetryingStore<S> {
    /// Wraps `inner` with the given retry policy.
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn run<T>(&self, op: &str, mut f: impl FnMut(&S) -> StoreResult<T>) -> StoreResult<T> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            std::thread::sleep(self.config.delay_for_attempt(attempt));
            match f(&self.inner) {
                Err(err) if err.is_unavailable() && attempt + 1 < attempts => {
                    warn!(op, attempt, error = %err, "store unavailable, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl<S: KeyValueStore> KeyValueStore for RetryingStore<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.run("get", |s| s.get(key))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        self.run("set", |s| s.set(key, value, ttl))
    }

    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        self.run("add", |s| s.add(key, value, ttl))
    }

    fn increment(&self, key: &str, amount: u64) -> StoreResult<u64> {
        self.run("increment", |s| s.increment(key, amount))
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.run("delete", |s| s.delete(key))
    }

    fn flush_all(&self) -> StoreResult<()> {
        self.run("flush_all", |s| s.flush_all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryStore, StoreError};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls with `Unavailable`.
    struct FlakyStore {
        inner: InMemoryStore,
        failures: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: InMemoryStore::new(),
                failures: AtomicU32::new(failures),
            }
        }

        fn trip(&self) -> StoreResult<()> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(StoreError::unavailable("flaky"));
            }
            Ok(())
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
            self.trip()?;
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
            self.trip()?;
            self.inner.set(key, value, ttl)
        }
        fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
            self.trip()?;
            self.inner.add(key, value, ttl)
        }
        fn increment(&self, key: &str, amount: u64) -> StoreResult<u64> {
            self.trip()?;
            self.inner.increment(key, amount)
        }
        fn delete(&self, key: &str) -> StoreResult<bool> {
            self.trip()?;
            self.inner.delete(key)
        }
        fn flush_all(&self) -> StoreResult<()> {
            self.trip()?;
            self.inner.flush_all()
        }
    }

    fn fast_retries(attempts: u32) -> RetryConfig {
        RetryConfig::new(attempts)
            .with_initial_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[test]
    fn retry_recovers_from_transient_outage() {
        let store = RetryingStore::new(FlakyStore::new(2), fast_retries(3));
        store.set("k", b"v", None).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn retry_gives_up_after_max_attempts() {
        let store = RetryingStore::new(FlakyStore::new(5), fast_retries(3));
        assert!(store.get("k").unwrap_err().is_unavailable());
    }

    #[test]
    fn retry_does_not_retry_definite_errors() {
        let store = RetryingStore::new(FlakyStore::new(0), fast_retries(3));
        store.add("k", b"1", None).unwrap();
        assert!(matches!(
            store.add("k", b"2", None),
            Err(StoreError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn retry_config_no_retry() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.delay_for_attempt(3), Duration::ZERO);
    }

    #[test]
    fn retry_delay_calculation() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(250))
            .with_jitter(false);
        assert_eq!(config.delay_for_attempt(8), Duration::from_millis(250));
    }
}
