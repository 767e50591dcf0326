//! Event log configuration.

use crate::bucket::Granularity;

/// TTL applied to entry slots written by `append`.
///
/// Head counters, waypoints and compacted slots always carry the bucket
/// expiry. Appended slots are a deployment choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotTtl {
    /// Write slots without a TTL, so the store's default expiry applies.
    /// Slots may then expire before (or after) their bucket's head counter.
    #[default]
    StoreDefault,
    /// Write slots with the bucket expiry, matching the head counter.
    BucketExpiry,
}

/// Configuration for event log handles.
#[derive(Debug, Clone)]
pub struct EventLogConfig {
    /// Length of each time bucket.
    pub granularity: Granularity,

    /// TTL policy for appended slots.
    pub slot_ttl: SlotTtl,

    /// Whether multi-log queries read their logs on parallel threads.
    pub parallel_reads: bool,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Day,
            slot_ttl: SlotTtl::StoreDefault,
            parallel_reads: true,
        }
    }
}

impl EventLogConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bucket granularity.
    #[must_use]
    pub const fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Sets the slot TTL policy.
    #[must_use]
    pub const fn slot_ttl(mut self, slot_ttl: SlotTtl) -> Self {
        self.slot_ttl = slot_ttl;
        self
    }

    /// Sets whether multi-log queries read in parallel.
    #[must_use]
    pub const fn parallel_reads(mut self, value: bool) -> Self {
        self.parallel_reads = value;
        self
    }
}
