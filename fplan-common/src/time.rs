//! Timestamp utilities
//!
//! Feed messages carry UTC timestamps as `YYYY-MM-DDTHH:MM:SSZ`; the store
//! keeps them as `YYYY-MM-DD HH:MM:SS`.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

/// Timestamp layout used by the upstream feed
pub const ZULU_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Timestamp layout written to the store
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a feed timestamp. Returns `None` for anything not in [`ZULU_FORMAT`].
pub fn parse_zulu(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), ZULU_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Convert a feed timestamp to the storage layout
///
/// Malformed input yields `None` so the field is left out of the update
/// instead of failing the whole message.
pub fn zulu_to_storage(value: &str) -> Option<String> {
    match parse_zulu(value) {
        Some(dt) => Some(dt.format(STORAGE_FORMAT).to_string()),
        None => {
            warn!(value, "Malformed feed timestamp, dropping field");
            None
        }
    }
}

/// True only if `value` parses and lies strictly before `now`.
///
/// Absent or malformed timestamps are never "before now".
pub fn is_before(value: Option<&str>, now: DateTime<Utc>) -> bool {
    value
        .and_then(parse_zulu)
        .map(|dt| dt < now)
        .unwrap_or(false)
}
