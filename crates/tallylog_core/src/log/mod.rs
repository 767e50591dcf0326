//! The event log engine.
//!
//! An [`EventLog`] is a lightweight handle over a [`KeyValueStore`]. It owns
//! no durable state: head counters, entry slots and waypoints all live in
//! the store under keys derived from a [`LogName`].
//!
//! ## Append protocol
//!
//! An append is one atomic `increment` of the head counter by the entry's
//! weight (creating the counter with `add` on first use), then one `add` of
//! the entry at the slot named by the new head. Slot indices are therefore
//! the running sum of weights, and each slot covers the index interval
//! `(index - weight, index]`. A backward scan steps from slot to slot by
//! weight; compaction rewrites slots so that this tiling still holds.
//!
//! ## Consistency
//!
//! There is no in-process locking. Correctness under concurrent appends rests
//! on the store's per-key atomic `increment` and `add`. Compaction rewrites
//! only slots at or below an index read beforehand, which appends never
//! touch, but two compactions of the same range must be serialized by the
//! caller.

mod compaction;
mod merge;
mod query;

use crate::bucket::{Clock, SystemClock, TimeBucket};
use crate::config::{EventLogConfig, SlotTtl};
use crate::error::{CoreError, CoreResult};
use crate::stats::LogStats;
use crate::types::{Entry, LogName};
use std::sync::Arc;
use std::time::Duration;
use tallylog_codec::{decode_counter, encode_counter, from_cbor, to_cbor};
use tallylog_store::{KeyValueStore, StoreError};
use tracing::{debug, warn};

pub use merge::sort_newest_first;

/// A handle onto one selected log in a key-value store.
///
/// # Example
///
/// ```rust
/// use tallylog_core::{EventLog, EventLogConfig, QueryModifiers};
/// use tallylog_store::InMemoryStore;
///
/// let mut log = EventLog::new(InMemoryStore::new(), EventLogConfig::default());
/// log.select_log("likes").unwrap();
///
/// log.append("liked-1").unwrap();
/// let head = log.append_weighted("liked-2", 3).unwrap();
/// assert_eq!(head, 4);
///
/// let items = log.query(QueryModifiers::new(), None).unwrap();
/// assert_eq!(items.len(), 2);
/// ```
pub struct EventLog<S> {
    store: S,
    config: EventLogConfig,
    clock: Arc<dyn Clock>,
    current: Option<LogName>,
    expiry: Duration,
    stats: LogStats,
}

impl<S: KeyValueStore> EventLog<S> {
    /// Creates a handle with no log selected, reading time from the system
    /// clock.
    pub fn new(store: S, config: EventLogConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Creates a handle with no log selected and a custom clock.
    pub fn with_clock(store: S, config: EventLogConfig, clock: Arc<dyn Clock>) -> Self {
        let expiry = TimeBucket::expiry_for(config.granularity);
        Self {
            store,
            config,
            clock,
            current: None,
            expiry,
            stats: LogStats::new(),
        }
    }

    /// Creates a handle and selects `name`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `name` is not a valid log name.
    pub fn open(store: S, config: EventLogConfig, name: &str) -> CoreResult<Self> {
        let mut log = Self::new(store, config);
        log.select_log(name)?;
        Ok(log)
    }

    /// Selects the active log in the bucket containing the current time.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `name` is invalid. The handle is then
    /// left in limited mode: mutating calls fail with
    /// [`CoreError::LimitedMode`], but it can still run `multi` queries.
    pub fn select_log(&mut self, name: &str) -> CoreResult<&mut Self> {
        let bucket = TimeBucket::current_bucket(self.config.granularity, self.clock.now());
        self.select_log_in_bucket(name, bucket)
    }

    /// Selects the active log in an explicit bucket, e.g. to finish
    /// processing a slice whose period has ended.
    ///
    /// # Errors
    ///
    /// Same as [`select_log`](Self::select_log).
    pub fn select_log_in_bucket(&mut self, name: &str, bucket: u64) -> CoreResult<&mut Self> {
        match LogName::new(name, bucket) {
            Ok(log) => {
                debug!(log = %log, "selected log");
                self.current = Some(log);
                self.expiry = TimeBucket::expiry_for(self.config.granularity);
                Ok(self)
            }
            Err(err) => {
                warn!(name, error = %err, "invalid log name, entering limited mode");
                self.current = None;
                Err(err)
            }
        }
    }

    /// Returns the selected log, or `None` in limited mode.
    pub fn current_log(&self) -> Option<&LogName> {
        self.current.as_ref()
    }

    /// Returns true if no valid log is selected.
    pub fn is_limited(&self) -> bool {
        self.current.is_none()
    }

    /// Returns the storage name of the selected log.
    pub fn storage_name(&self) -> Option<&str> {
        self.current.as_ref().map(LogName::storage_name)
    }

    /// Returns how long data written by this handle is kept.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Returns the handle configuration.
    pub fn config(&self) -> &EventLogConfig {
        &self.config
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns this handle's operation counters.
    pub fn stats(&self) -> &LogStats {
        &self.stats
    }

    /// Appends `key` with weight 1.
    ///
    /// Returns the index of the new slot.
    ///
    /// # Errors
    ///
    /// See [`append_weighted`](Self::append_weighted).
    pub fn append(&self, key: &str) -> CoreResult<u64> {
        self.append_weighted(key, 1)
    }

    /// Appends `key` with the given weight.
    ///
    /// Returns the index of the new slot, which is the head counter after
    /// the append. Nothing is retried: a caller racing another appender for
    /// the very first slot of a bucket gets [`CoreError::AppendFailed`] and
    /// may simply try again.
    ///
    /// # Errors
    ///
    /// - [`CoreError::LimitedMode`] if no log is selected
    /// - [`CoreError::Configuration`] if `weight` is 0
    /// - [`CoreError::AppendFailed`] if the store rejected the head update,
    ///   the head would pass `u64::MAX`, or the slot write failed. In the
    ///   last case the head has already moved and
    ///   the slot stays missing; scans report it as corrupted.
    pub fn append_weighted(&self, key: &str, weight: u64) -> CoreResult<u64> {
        let log = self.active()?;
        if weight == 0 {
            return Err(CoreError::configuration("entry weight must be at least 1"));
        }

        let entry = Entry::new(key, weight, self.clock.now());
        let record = to_cbor(&entry)?;

        let head = match self.store.increment(log.storage_name(), weight) {
            Ok(head) if head >= weight => head,
            // a backend with wrapping counters already moved the head
            Ok(head) => {
                warn!(log = %log, index = head, weight, "head counter wrapped");
                let err = StoreError::Overflow {
                    key: log.storage_name().to_string(),
                };
                return Err(self.append_failure(log, err));
            }
            Err(StoreError::NotFound { .. }) => {
                match self
                    .store
                    .add(log.storage_name(), &encode_counter(weight), Some(self.expiry))
                {
                    Ok(()) => weight,
                    Err(err) => return Err(self.append_failure(log, err)),
                }
            }
            Err(err) => return Err(self.append_failure(log, err)),
        };

        let ttl = match self.config.slot_ttl {
            SlotTtl::StoreDefault => None,
            SlotTtl::BucketExpiry => Some(self.expiry),
        };
        if let Err(err) = self.store.add(&log.slot_key(head), &record, ttl) {
            warn!(log = %log, index = head, error = %err, "slot write failed after head moved");
            return Err(self.append_failure(log, err));
        }

        self.stats.record_append();
        debug!(log = %log, key, weight, index = head, "appended");
        Ok(head)
    }

    /// Returns the head counter of the selected log, `None` if it has no
    /// entries or the store is unreachable.
    pub fn head(&self) -> Option<u64> {
        self.current
            .as_ref()
            .and_then(|log| self.read_counter(log.storage_name()))
    }

    /// Returns the stored waypoint of the selected log.
    pub fn waypoint(&self) -> Option<u64> {
        self.current
            .as_ref()
            .and_then(|log| self.read_counter(&log.waypoint_key()))
    }

    /// Stores `index` as the selected log's waypoint.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LimitedMode`] if no log is selected, or the store
    /// error if the write fails.
    pub fn set_waypoint(&self, index: u64) -> CoreResult<()> {
        let log = self.active()?;
        self.write_waypoint(log, index)
    }

    /// Removes the selected log's waypoint.
    ///
    /// Returns whether a waypoint existed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LimitedMode`] if no log is selected, or the store
    /// error if the delete fails.
    pub fn clear_waypoint(&self) -> CoreResult<bool> {
        let log = self.active()?;
        Ok(self.store.delete(&log.waypoint_key())?)
    }

    fn active(&self) -> CoreResult<&LogName> {
        self.current.as_ref().ok_or(CoreError::LimitedMode)
    }

    fn append_failure(&self, log: &LogName, err: StoreError) -> CoreError {
        self.stats.record_append_failure();
        CoreError::append_failed(log.storage_name(), err.to_string())
    }

    /// Names `base` in the selected log's bucket (or the current bucket in
    /// limited mode).
    fn sibling(&self, base: &str) -> CoreResult<LogName> {
        let bucket = match &self.current {
            Some(log) => log.bucket(),
            None => TimeBucket::current_bucket(self.config.granularity, self.clock.now()),
        };
        LogName::new(base, bucket)
    }

    fn write_waypoint(&self, log: &LogName, index: u64) -> CoreResult<()> {
        self.store
            .set(&log.waypoint_key(), &encode_counter(index), Some(self.expiry))?;
        debug!(log = %log, index, "waypoint stored");
        Ok(())
    }

    /// Reads a counter, degrading store and decode failures to absent.
    fn read_counter(&self, key: &str) -> Option<u64> {
        match self.store.get(key) {
            Ok(Some(raw)) => match decode_counter(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key, error = %err, "unreadable counter");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "counter read failed");
                None
            }
        }
    }

    /// Reads a slot, degrading store and decode failures to absent.
    fn read_slot(&self, log: &LogName, index: u64) -> Option<Entry> {
        self.stats.record_slot_read();
        let key = log.slot_key(index);
        match self.store.get(&key) {
            Ok(Some(raw)) => match from_cbor::<Entry>(&raw) {
                Ok(entry) if entry.weight > 0 => Some(entry),
                Ok(_) => {
                    warn!(key, "slot holds a zero-weight entry");
                    None
                }
                Err(err) => {
                    warn!(key, error = %err, "unreadable slot");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "slot read failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{Granularity, ManualClock};
    use std::sync::Mutex;
    use tallylog_store::{InMemoryStore, StoreResult};

    const NOW: u64 = 1_700_000_000;

    fn handle(name: &str) -> EventLog<InMemoryStore> {
        let mut log = EventLog::with_clock(
            InMemoryStore::new(),
            EventLogConfig::default(),
            Arc::new(ManualClock::new(NOW)),
        );
        log.select_log(name).unwrap();
        log
    }

    #[test]
    fn select_log_derives_storage_name() {
        let log = handle("likes");
        assert_eq!(log.storage_name(), Some("likes_19675"));
        assert_eq!(log.expiry(), Duration::from_secs(172_800));
        assert!(!log.is_limited());
    }

    #[test]
    fn select_log_uses_configured_granularity() {
        let mut log = EventLog::with_clock(
            InMemoryStore::new(),
            EventLogConfig::new().granularity(Granularity::Hour),
            Arc::new(ManualClock::new(7_200)),
        );
        log.select_log("views").unwrap();
        assert_eq!(log.storage_name(), Some("views_2"));
        assert_eq!(log.expiry(), Duration::from_secs(7_200));
    }

    #[test]
    fn invalid_name_enters_limited_mode() {
        let mut log = handle("likes");
        assert!(matches!(
            log.select_log(""),
            Err(CoreError::Configuration { .. })
        ));
        assert!(log.is_limited());
        assert!(matches!(log.append("x"), Err(CoreError::LimitedMode)));
        assert!(matches!(log.set_waypoint(3), Err(CoreError::LimitedMode)));
        assert_eq!(log.head(), None);

        // still usable once a valid log is selected
        log.select_log("likes").unwrap();
        assert_eq!(log.append("x").unwrap(), 1);
    }

    #[test]
    fn append_assigns_prefix_sums() {
        let log = handle("likes");
        assert_eq!(log.append("a").unwrap(), 1);
        assert_eq!(log.append_weighted("b", 4).unwrap(), 5);
        assert_eq!(log.append_weighted("c", 2).unwrap(), 7);
        assert_eq!(log.head(), Some(7));

        let slot = log.read_slot(log.current_log().unwrap(), 5).unwrap();
        assert_eq!(slot, Entry::new("b", 4, NOW));
        assert_eq!(log.stats().snapshot().appends, 3);
    }

    #[test]
    fn append_first_weight_creates_head() {
        let log = handle("likes");
        assert_eq!(log.append_weighted("a", 3).unwrap(), 3);
        assert_eq!(log.store().get("likes_19675").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn append_rejects_zero_weight() {
        let log = handle("likes");
        assert!(matches!(
            log.append_weighted("a", 0),
            Err(CoreError::Configuration { .. })
        ));
        assert_eq!(log.head(), None);
    }

    #[test]
    fn append_fails_cleanly_when_store_is_down() {
        let log = handle("likes");
        log.store().set_available(false);
        assert!(matches!(
            log.append("a"),
            Err(CoreError::AppendFailed { .. })
        ));
        assert_eq!(log.stats().snapshot().append_failures, 1);

        log.store().set_available(true);
        assert_eq!(log.append("a").unwrap(), 1);
    }

    #[test]
    fn append_fails_when_slot_is_taken() {
        let log = handle("likes");
        log.store().set("likes_19675_1", b"squatter", None).unwrap();
        assert!(matches!(
            log.append("a"),
            Err(CoreError::AppendFailed { .. })
        ));
        // the head moved anyway
        assert_eq!(log.head(), Some(1));
    }

    #[test]
    fn append_refuses_to_overflow_the_head() {
        let log = handle("likes");
        let near = (u64::MAX - 1).to_string();
        log.store().add("likes_19675", near.as_bytes(), None).unwrap();

        assert!(matches!(
            log.append_weighted("a", 5),
            Err(CoreError::AppendFailed { .. })
        ));
        assert_eq!(log.head(), Some(u64::MAX - 1));
        assert_eq!(log.stats().snapshot().append_failures, 1);
    }

    /// Wraps the in-memory store and records the TTL of every `add`.
    #[derive(Default)]
    struct TtlRecorder {
        inner: InMemoryStore,
        adds: Mutex<Vec<(String, Option<Duration>)>>,
    }

    impl TtlRecorder {
        fn ttl_of(&self, key: &str) -> Option<Option<Duration>> {
            self.adds
                .lock()
                .unwrap()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, ttl)| *ttl)
        }
    }

    impl KeyValueStore for TtlRecorder {
        fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
            self.inner.set(key, value, ttl)
        }

        fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
            self.adds.lock().unwrap().push((key.to_string(), ttl));
            self.inner.add(key, value, ttl)
        }

        fn increment(&self, key: &str, amount: u64) -> StoreResult<u64> {
            self.inner.increment(key, amount)
        }

        fn delete(&self, key: &str) -> StoreResult<bool> {
            self.inner.delete(key)
        }

        fn flush_all(&self) -> StoreResult<()> {
            self.inner.flush_all()
        }
    }

    fn recorded_handle(slot_ttl: SlotTtl) -> EventLog<TtlRecorder> {
        let mut log = EventLog::with_clock(
            TtlRecorder::default(),
            EventLogConfig::new().slot_ttl(slot_ttl),
            Arc::new(ManualClock::new(NOW)),
        );
        log.select_log("likes").unwrap();
        log
    }

    #[test]
    fn slot_ttl_policy_is_applied() {
        let bucket_ttl = Some(Duration::from_secs(172_800));

        let log = recorded_handle(SlotTtl::StoreDefault);
        assert_eq!(log.append("a").unwrap(), 1);
        assert_eq!(log.store().ttl_of("likes_19675"), Some(bucket_ttl));
        assert_eq!(log.store().ttl_of("likes_19675_1"), Some(None));

        let log = recorded_handle(SlotTtl::BucketExpiry);
        assert_eq!(log.append("a").unwrap(), 1);
        assert_eq!(log.store().ttl_of("likes_19675"), Some(bucket_ttl));
        assert_eq!(log.store().ttl_of("likes_19675_1"), Some(bucket_ttl));
    }

    #[test]
    fn waypoint_accessors() {
        let log = handle("likes");
        assert_eq!(log.waypoint(), None);
        log.set_waypoint(0).unwrap();
        // a stored zero is distinct from absent
        assert_eq!(log.waypoint(), Some(0));
        log.set_waypoint(12).unwrap();
        assert_eq!(log.waypoint(), Some(12));
        assert!(log.clear_waypoint().unwrap());
        assert_eq!(log.waypoint(), None);
    }

    #[test]
    fn reads_degrade_to_absent_when_store_is_down() {
        let log = handle("likes");
        log.append("a").unwrap();
        log.store().set_available(false);
        assert_eq!(log.head(), None);
        assert_eq!(log.waypoint(), None);
    }

    #[test]
    fn buckets_are_isolated() {
        let clock = Arc::new(ManualClock::new(NOW));
        let mut log = EventLog::with_clock(
            InMemoryStore::new(),
            EventLogConfig::default(),
            clock.clone(),
        );
        log.select_log("likes").unwrap();
        log.append("a").unwrap();

        clock.advance(Granularity::Day.seconds());
        log.select_log("likes").unwrap();
        assert_eq!(log.storage_name(), Some("likes_19676"));
        assert_eq!(log.head(), None);
        assert_eq!(log.append("b").unwrap(), 1);

        log.select_log_in_bucket("likes", 19_675).unwrap();
        assert_eq!(log.head(), Some(1));
    }
}
