//! Shared utility functions for WRM crates.

/// Timestamp helpers for sensor API payloads.
pub mod dates {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
    use std::fmt::Display;

    /// Format used for "last updated" stamps shown in station popups:
    /// "DD/MM/YYYY, HH:MM:SS"
    pub const UPDATED_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

    /// Offset formats RFC 3339 parsing rejects, e.g. "+1000" without a colon.
    const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

    /// Naive formats the sensor API has been seen to emit (no offset).
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    /// Parse a sensor API `dt` string.
    ///
    /// - RFC 3339 strings carry their own offset.
    /// - Offset-less date-times are interpreted in `tz`.
    /// - Bare dates ("YYYY-MM-DD") are midnight UTC.
    pub fn parse_timestamp_in<Tz: TimeZone>(s: &str, tz: &Tz) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, format) {
                return Some(dt.with_timezone(&Utc));
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return tz
                    .from_local_datetime(&naive)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    /// Milliseconds since the Unix epoch, interpreting offset-less values in `tz`.
    pub fn to_epoch_millis_in<Tz: TimeZone>(s: &str, tz: &Tz) -> Option<i64> {
        parse_timestamp_in(s, tz).map(|dt| dt.timestamp_millis())
    }

    /// Format an instant in the given time zone using [`UPDATED_FORMAT`].
    pub fn format_in<Tz: TimeZone>(dt: &DateTime<Utc>, tz: &Tz) -> String
    where
        Tz::Offset: Display,
    {
        dt.with_timezone(tz).format(UPDATED_FORMAT).to_string()
    }

    /// Token appended to history requests so browser/proxy caches are bypassed.
    pub fn cache_bust_token() -> i64 {
        Utc::now().timestamp_millis()
    }

}
