//! Timestamp helpers for lineage events.
//!
//! Lineage events carry second-precision UTC times in the form
//! `YYYY-MM-DDTHH:MM:SSZ`.

use chrono::{DateTime, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// The `eventTime` format used by lineage events.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Returns the current UTC time formatted as a lineage `eventTime`.
///
/// # Examples
///
/// ```
/// use se_transform::utils::event_time;
///
/// let ts = event_time();
/// assert!(ts.ends_with('Z'));
/// ```
#[must_use]
pub fn event_time() -> String {
    format_event_time(&Utc::now())
}

/// Formats a timestamp as a lineage `eventTime`.
#[must_use]
pub fn format_event_time(dt: &Timestamp) -> String {
    dt.format(EVENT_TIME_FORMAT).to_string()
}
