//! # tallylog codec
//!
//! Value encoding for tallylog.
//!
//! Two kinds of values live in the key-value store:
//! - **Records** (log entries): serde types encoded as CBOR via `ciborium`
//! - **Counters** (head counters, waypoints): decimal ASCII integers, the
//!   representation memcached-style `incr` operates on
//!
//! ## Usage
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use tallylog_codec::{decode_counter, encode_counter, from_cbor, to_cbor};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Hit {
//!     page: String,
//! }
//!
//! let bytes = to_cbor(&Hit { page: "/".into() }).unwrap();
//! let hit: Hit = from_cbor(&bytes).unwrap();
//! assert_eq!(hit.page, "/");
//!
//! assert_eq!(encode_counter(42), b"42".to_vec());
//! assert_eq!(decode_counter(b"42").unwrap(), 42);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod counter;
mod error;
mod record;

pub use counter::{decode_counter, encode_counter};
pub use error::{CodecError, CodecResult};
pub use record::{from_cbor, to_cbor};
