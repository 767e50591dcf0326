//! Namespacing wrapper applying deployment settings to every call.

use crate::backend::KeyValueStore;
use crate::error::StoreResult;
use std::time::Duration;

/// Deployment settings shared by every log stored in one cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Prefix prepended verbatim to every key.
    pub key_prefix: String,

    /// TTL used for writes that don't carry one (`None` = never expire).
    pub default_ttl: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            default_ttl: Some(Duration::from_secs(4 * 60 * 60)), // 4 hours
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the default TTL.
    #[must_use]
    pub const fn default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// A store wrapper that namespaces keys and fills in default TTLs.
///
/// Several applications can share one cache by giving each its own
/// [`StoreConfig::key_prefix`]. Writes issued with `ttl = None` receive
/// [`StoreConfig::default_ttl`].
///
/// # Example
///
/// ```rust
/// use tallylog_store::{InMemoryStore, KeyValueStore, PrefixedStore, StoreConfig};
///
/// let store = PrefixedStore::new(InMemoryStore::new(), StoreConfig::new().key_prefix("app_"));
/// store.set("views", b"1", None).unwrap();
/// assert_eq!(store.inner().keys(), vec!["app_views".to_string()]);
/// ```
#[derive(Debug)]
pub struct PrefixedStore<S> {
    inner: S,
    config: StoreConfig,
}

impl<S: KeyValueStore> PrefixedStore<S> {
    /// Wraps `inner` with the given settings.
    pub fn new(inner: S, config: StoreConfig) -> Self {
        Self { inner, config }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns the active settings.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    fn ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        ttl.or(self.config.default_ttl)
    }
}

impl<S: KeyValueStore> KeyValueStore for PrefixedStore<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(&self.key(key))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        self.inner.set(&self.key(key), value, self.ttl(ttl))
    }

    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        self.inner.add(&self.key(key), value, self.ttl(ttl))
    }

    fn increment(&self, key: &str, amount: u64) -> StoreResult<u64> {
        self.inner.increment(&self.key(key), amount)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.inner.delete(&self.key(key))
    }

    fn flush_all(&self) -> StoreResult<()> {
        self.inner.flush_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryStore, StoreError};

    #[test]
    fn prefixed_keys_are_namespaced() {
        let store = PrefixedStore::new(InMemoryStore::new(), StoreConfig::new().key_prefix("m_"));
        store.add("likes_1", b"1", None).unwrap();
        store.increment("likes_1", 2).unwrap();

        assert_eq!(store.inner().keys(), vec!["m_likes_1".to_string()]);
        assert_eq!(store.get("likes_1").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.inner().get("likes_1").unwrap(), None);
    }

    #[test]
    fn prefixed_default_ttl_applies() {
        let config = StoreConfig::new().default_ttl(Some(Duration::from_millis(1)));
        let store = PrefixedStore::new(InMemoryStore::new(), config);
        store.set("short", b"v", None).unwrap();
        store.set("pinned", b"v", Some(Duration::from_secs(60))).unwrap();
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(store.get("short").unwrap(), None);
        assert_eq!(store.get("pinned").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn prefixed_errors_pass_through() {
        let store = PrefixedStore::new(InMemoryStore::new(), StoreConfig::new());
        assert!(matches!(
            store.increment("absent", 1),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert!(config.key_prefix.is_empty());
        assert_eq!(config.default_ttl, Some(Duration::from_secs(14_400)));
    }
}
