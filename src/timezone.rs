//! Timestamp interpretation in a site's local zone
//!
//! Zone-less timestamps are read as wall-clock time in the context's zone.
//! The context is passed explicitly into every extraction pass instead of
//! changing any process-wide setting.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{BridgeError, Result};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeContext {
    zone: Tz,
}

impl TimeContext {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// Build from an IANA zone name such as `Europe/Berlin`.
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|e| BridgeError::Config(format!("unknown time zone {name}: {e}")))
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Parse a source timestamp. Unparsable input yields `None`.
    pub fn parse_timestamp(&self, raw: &str) -> Option<DateTime<Tz>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&self.zone));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
            return Some(dt.with_timezone(&self.zone));
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return self.localize(naive);
            }
        }
        for format in NAIVE_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return self.localize(date.and_hms_opt(0, 0, 0)?);
            }
        }

        if let Ok(secs) = raw.parse::<i64>() {
            return Utc
                .timestamp_opt(secs, 0)
                .single()
                .map(|dt| dt.with_timezone(&self.zone));
        }

        debug!(raw, zone = %self.zone, "unparsable timestamp");
        None
    }

    /// Wall-clock time in the zone. Ambiguous times take the earlier instant;
    /// times skipped by a DST jump are rejected.
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        self.zone
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| self.zone.from_local_datetime(&naive).latest())
    }
}

impl Default for TimeContext {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}
