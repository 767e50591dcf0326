//! Decimal counter encoding.
//!
//! Counters are stored as ASCII digits so the backing store can increment
//! them in place.

use crate::error::{CodecError, CodecResult};

/// Encode a counter as decimal ASCII.
#[must_use]
pub fn encode_counter(value: u64) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// Decode a decimal ASCII counter.
///
/// Surrounding whitespace is tolerated, as memcached pads counters that
/// shrink after a decrement.
///
/// # Errors
///
/// Returns [`CodecError::InvalidCounter`] if the bytes are not an unsigned
/// decimal integer.
pub fn decode_counter(bytes: &[u8]) -> CodecResult<u64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| CodecError::InvalidCounter {
            raw: String::from_utf8_lossy(bytes).into_owned(),
        })
}
