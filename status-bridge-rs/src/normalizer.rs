//! Timestamp normalization for the status page
//!
//! Upstream timestamps arrive as ISO-8601 strings with a fixed UTC offset.
//! The status page stores wall-clock strings in its own timezone, at minute
//! precision, while deduplication compares second-precision strings.

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use thiserror::Error;

/// Format written into `scheduled_at` / `completed_at`
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Format the status page echoes back, used for dedup keys
pub const LOOKUP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// One instant rendered in both status-page formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTime {
    pub storage: String,
    pub lookup: String,
}

/// Converts fixed-offset instants into the status page's timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeNormalizer {
    timezone: Tz,
}

impl TimeNormalizer {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Build a normalizer from an IANA timezone name such as `Europe/Berlin`
    pub fn from_name(name: &str) -> Result<Self, NormalizeError> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| NormalizeError::UnknownTimezone(name.to_string()))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Parse an upstream timestamp (`2024-01-01T10:00:00-05:00`)
    pub fn parse(raw: &str) -> Result<DateTime<FixedOffset>, NormalizeError> {
        DateTime::parse_from_rfc3339(raw.trim()).map_err(|source| NormalizeError::InvalidTimestamp {
            value: raw.to_string(),
            source,
        })
    }

    pub fn normalize(&self, instant: DateTime<FixedOffset>) -> NormalizedTime {
        let local = instant.with_timezone(&self.timezone);
        NormalizedTime {
            storage: local.format(STORAGE_FORMAT).to_string(),
            lookup: local.format(LOOKUP_FORMAT).to_string(),
        }
    }
}

/// Identity of a maintenance window on the status page
pub fn dedup_key(start: &str, end: &str) -> String {
    format!("{}_{}", start, end)
}
