//! Watermark: the creation time of the newest account already welcomed.
//!
//! The stored form is the raw timestamp string, exactly as the API returned
//! it (or as generated for the default lookback), so a stored value always
//! round-trips to the same instant.

mod store;

pub use store::{FileWatermarkStore, WatermarkError};

use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// How far back the first run looks when no watermark is stored.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

/// Fallback profile: whole seconds, with an offset that may be `Z`, `+hh`,
/// `+hhmm` or `+hh:mm`.
const LOOSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%#z";

/// Parses an ISO-8601 timestamp.
///
/// Tries RFC 3339 first (fractional seconds allowed), then a looser profile
/// without fractional seconds. An offset is required by both; a timestamp
/// without one is not parsed.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    DateTime::parse_from_str(raw, LOOSE_FORMAT)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// A parsed timestamp together with its original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    raw: String,
    at: DateTime<Utc>,
}

impl Watermark {
    /// Parses `raw`, keeping it verbatim (trimmed) for persistence.
    pub fn parse(raw: &str) -> Option<Self> {
        let at = parse_timestamp(raw)?;
        Some(Self {
            raw: raw.trim().to_string(),
            at,
        })
    }

    /// Builds a watermark for `at`, rendered with millisecond precision.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            raw: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            at,
        }
    }

    /// The watermark used when nothing is stored: `now` minus the lookback.
    pub fn lookback_from(now: DateTime<Utc>, lookback: Duration) -> Self {
        Self::from_datetime(now - lookback)
    }

    pub fn default_lookback() -> Duration {
        Duration::hours(DEFAULT_LOOKBACK_HOURS)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
