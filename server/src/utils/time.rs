//! Time utility functions

use chrono::Utc;

/// Nanoseconds per millisecond.
pub const NANOS_PER_MILLI: u128 = 1_000_000;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Parse an opaque decimal nanosecond timestamp string.
///
/// Timestamps arrive as decimal strings to avoid precision loss in
/// transports that coerce large integers to floats. Parsing goes through
/// `u128`, never a floating-point type. Returns `None` for empty or
/// non-decimal input.
pub fn parse_unix_nanos(value: &str) -> Option<u128> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<u128>().ok()
}

/// Convert a millisecond wall-clock timestamp to nanoseconds.
pub fn millis_to_nanos(millis: u64) -> u128 {
    u128::from(millis) * NANOS_PER_MILLI
}

/// Difference between two nanosecond timestamps in whole milliseconds.
///
/// Returns `None` when `end < start`; a negative duration is always bad
/// data (clock skew or a partial write) and must not be reported.
pub fn nanos_diff_millis(start: u128, end: u128) -> Option<u64> {
    let diff = end.checked_sub(start)?;
    u64::try_from(diff / NANOS_PER_MILLI).ok()
}
