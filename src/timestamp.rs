//! Timestamp codec
//!
//! Sensor logs carry timestamps as `YYYY-MM-DD HH:MM:SS:fff`, where the last
//! colon-delimited segment is a millisecond field. This module parses them into
//! [`NaiveDateTime`] values and buckets them into fixed-size [`WindowKey`]s.

use crate::error::AnalyzeError;
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Format of everything before the fractional-second segment
const BASE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical textual form of a window key
pub const WINDOW_KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sub-second precision the fractional field is padded/truncated to (microseconds)
const SUBSECOND_DIGITS: usize = 6;

/// Default window size in minutes
pub const DEFAULT_WINDOW_MINUTES: u32 = 1;

/// Parse a sensor timestamp such as `2025-07-14 11:42:58:448`.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, AnalyzeError> {
    let malformed = || AnalyzeError::MalformedTimestamp(raw.to_string());

    let (base, fraction) = raw.rsplit_once(':').ok_or_else(malformed)?;
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    // Right-pad with zeros, then truncate to microsecond precision
    let mut digits: String = fraction.chars().take(SUBSECOND_DIGITS).collect();
    while digits.len() < SUBSECOND_DIGITS {
        digits.push('0');
    }
    let micros: u32 = digits.parse().map_err(|_| malformed())?;

    let base = NaiveDateTime::parse_from_str(base, BASE_FORMAT).map_err(|_| malformed())?;
    base.with_nanosecond(micros * 1_000).ok_or_else(malformed)
}

/// Start of a fixed-size time bucket.
///
/// Ordering is chronological, which coincides with the lexical order of the
/// canonical string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowKey(NaiveDateTime);

impl WindowKey {
    /// Bucket a timestamp into a window of `window_minutes`.
    ///
    /// Minutes are floored to the nearest multiple of the window size within
    /// the hour; seconds and sub-seconds are zeroed.
    pub fn bucket(timestamp: NaiveDateTime, window_minutes: u32) -> Self {
        let size = window_minutes.max(1);
        let minute = (timestamp.minute() / size) * size;
        let start = timestamp
            .date()
            .and_hms_opt(timestamp.hour(), minute, 0)
            .unwrap_or(timestamp);
        WindowKey(start)
    }

    /// First instant covered by this window
    pub fn start(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WINDOW_KEY_FORMAT))
    }
}

impl FromStr for WindowKey {
    type Err = AnalyzeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDateTime::parse_from_str(s, WINDOW_KEY_FORMAT)
            .map(WindowKey)
            .map_err(|_| AnalyzeError::MalformedTimestamp(s.to_string()))
    }
}

impl Serialize for WindowKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WindowKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Window key for a timestamp
pub fn window_key(timestamp: NaiveDateTime, window_minutes: u32) -> WindowKey {
    WindowKey::bucket(timestamp, window_minutes)
}
