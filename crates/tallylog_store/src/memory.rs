//! In-memory key-value store for testing.

use crate::backend::{KeyValueStore, MAX_KEY_LEN};
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Writes between two sweeps of expired values.
const SWEEP_INTERVAL: u64 = 1024;

#[derive(Debug, Clone)]
struct StoredValue {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(data: &[u8], ttl: Option<Duration>) -> Self {
        Self {
            data: data.to_vec(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// An in-memory key-value store.
///
/// This store keeps all values in a map and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Single-process deployments that don't need a shared cache
///
/// Expired values stop being visible as soon as their TTL passes and are
/// removed from the map by a sweep that runs every 1024
/// writes, or on demand with [`purge_expired`](Self::purge_expired). The store
/// can be switched "offline" with [`set_available`](Self::set_available) to
/// exercise the degraded paths of callers.
///
/// # Thread Safety
///
/// This store is thread-safe; `add` and `increment` are atomic under the
/// write lock.
///
/// # Example
///
/// ```rust
/// use tallylog_store::{InMemoryStore, KeyValueStore};
///
/// let store = InMemoryStore::new();
/// store.set("greeting", b"hello", None).unwrap();
/// assert_eq!(store.get("greeting").unwrap().as_deref(), Some(&b"hello"[..]));
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, StoredValue>>,
    available: AtomicBool,
    writes: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            writes: AtomicU64::new(0),
        }
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live (unexpired) keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.values.read().values().filter(|v| v.is_live(now)).count()
    }

    /// Returns true if the store holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns all live keys, sorted.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .values
            .read()
            .iter()
            .filter(|(_, v)| v.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Simulates the backend going offline (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns whether the store currently accepts operations.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Removes every expired value from the map.
    ///
    /// Returns the number of values removed.
    pub fn purge_expired(&self) -> usize {
        let mut values = self.values.write();
        Self::sweep(&mut values)
    }

    fn sweep(values: &mut HashMap<String, StoredValue>) -> usize {
        let now = Instant::now();
        let before = values.len();
        values.retain(|_, v| v.is_live(now));
        before - values.len()
    }

    fn note_write(&self, values: &mut HashMap<String, StoredValue>) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_INTERVAL == 0 {
            Self::sweep(values);
        }
    }

    fn check(&self, key: &str) -> StoreResult<()> {
        if !self.is_available() {
            return Err(StoreError::unavailable("in-memory store is offline"));
        }
        if key.is_empty()
            || key.len() > MAX_KEY_LEN
            || key.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.check(key)?;
        let values = self.values.read();
        Ok(values
            .get(key)
            .filter(|v| v.is_live(Instant::now()))
            .map(|v| v.data.clone()))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        self.check(key)?;
        let mut values = self.values.write();
        values.insert(key.to_string(), StoredValue::new(value, ttl));
        self.note_write(&mut values);
        Ok(())
    }

    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        self.check(key)?;
        let mut values = self.values.write();
        if values.get(key).is_some_and(|v| v.is_live(Instant::now())) {
            return Err(StoreError::already_exists(key));
        }
        values.insert(key.to_string(), StoredValue::new(value, ttl));
        self.note_write(&mut values);
        Ok(())
    }

    fn increment(&self, key: &str, amount: u64) -> StoreResult<u64> {
        self.check(key)?;
        let mut values = self.values.write();
        let stored = match values.get_mut(key) {
            Some(v) if v.is_live(Instant::now()) => v,
            _ => return Err(StoreError::not_found(key)),
        };

        let current = std::str::from_utf8(&stored.data)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| StoreError::NotNumeric {
                key: key.to_string(),
            })?;

        let next = current
            .checked_add(amount)
            .ok_or_else(|| StoreError::Overflow {
                key: key.to_string(),
            })?;
        stored.data = next.to_string().into_bytes();
        Ok(next)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check(key)?;
        let removed = self.values.write().remove(key);
        Ok(removed.is_some_and(|v| v.is_live(Instant::now())))
    }

    fn flush_all(&self) -> StoreResult<()> {
        if !self.is_available() {
            return Err(StoreError::unavailable("in-memory store is offline"));
        }
        self.values.write().clear();
        Ok(())
    }
}
