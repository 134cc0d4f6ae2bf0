//! Date/time utilities for the scrapper.
//!
//! Timestamps are persisted as fixed-width UTC text so that SQL string
//! comparison orders them chronologically.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

/// Storage format: microsecond precision, always UTC.
const DB_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Default format for timestamps shown to chat users.
pub const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Encode a timestamp for storage.
pub fn to_db(dt: &DateTime<Utc>) -> String {
    dt.format(DB_FORMAT).to_string()
}

/// Decode a stored timestamp.
///
/// Accepts the storage format, any RFC3339 string and the SQLite
/// `datetime('now')` format (assumed UTC).
pub fn from_db(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Truncate a timestamp to the precision kept in storage.
///
/// Comparing an in-memory `Utc::now()` with a value read back from the
/// database only makes sense at the same precision.
pub fn storage_precision(dt: DateTime<Utc>) -> DateTime<Utc> {
    from_db(&to_db(&dt)).unwrap_or(dt)
}

/// Format a UTC timestamp in the given timezone.
///
/// Falls back to UTC if the timezone name is unknown.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}

/// RFC3339 rendering with a trailing `Z`, as expected by query parameters of
/// the external APIs.
pub fn to_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
