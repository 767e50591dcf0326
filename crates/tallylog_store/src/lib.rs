//! # tallylog store
//!
//! Key-value store contract and adapters for tallylog.
//!
//! This crate provides the lowest-level storage abstraction for tallylog.
//! Stores are **opaque key-value caches** - they do not interpret the values
//! they hold, apart from the decimal counters used by `increment`.
//!
//! ## Design Principles
//!
//! - Stores expose only memcached-style primitives (get, set, add, incr, delete)
//! - "Absent" is always `None`, never a stored sentinel value
//! - Every operation returns a [`StoreResult`]; nothing panics on backend failure
//! - Must be `Send + Sync` so handles can be shared across threads
//! - Resilience (prefixing, default TTLs, retries) lives in wrapping adapters
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing, demos and single-process deployments
//! - [`PrefixedStore`] - Wrapper applying a deployment key prefix and default TTL
//! - [`RetryingStore`] - Wrapper retrying operations while the backend is unavailable
//!
//! ## Example
//!
//! ```rust
//! use tallylog_store::{InMemoryStore, KeyValueStore};
//!
//! let store = InMemoryStore::new();
//! store.add("visits", b"1", None).unwrap();
//! assert_eq!(store.increment("visits", 4).unwrap(), 5);
//! assert_eq!(store.get("visits").unwrap(), Some(b"5".to_vec()));
//! assert_eq!(store.get("missing").unwrap(), None);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;
mod prefixed;
mod retry;

pub use backend::{KeyValueStore, MAX_KEY_LEN};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use prefixed::{PrefixedStore, StoreConfig};
pub use retry::{RetryConfig, RetryingStore};
