//! Creation timestamps: the filename convention and the two timestamp frames.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Prefix used by generated recordings, e.g. `tts_2024-12-08T16_48_07.mp3`.
pub const DEFAULT_TIMESTAMP_PREFIX: &str = "tts_";

/// Length of `YYYY-MM-DDTHH_MM_SS`.
const STAMP_LEN: usize = 19;

/// Parse the creation time encoded in a file name as `<prefix>YYYY-MM-DDTHH_MM_SS`.
///
/// `name` may be a bare file name or a path. The stamp must directly follow
/// `prefix` and be followed by the end of the name or a non-digit. Every field
/// is range-checked (calendar-aware for days) and the result is UTC seconds.
pub fn parse_timestamp_from_filename(name: &str, prefix: &str) -> Option<i64> {
    let file_name = Path::new(name).file_name()?.to_str()?;
    let rest = file_name.strip_prefix(prefix)?;
    let stamp = rest.get(..STAMP_LEN)?;
    if rest[STAMP_LEN..].chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }

    let b = stamp.as_bytes();
    let separators = [(4, b'-'), (7, b'-'), (10, b'T'), (13, b'_'), (16, b'_')];
    if separators.iter().any(|&(i, sep)| b[i] != sep) {
        return None;
    }

    let field = |range: std::ops::Range<usize>| -> Option<u32> {
        let digits = &stamp[range];
        if !digits.bytes().all(|d| d.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    };

    let year = i32::try_from(field(0..4)?).ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(5..7)?, field(8..10)?)?;
    let time = NaiveTime::from_hms_opt(field(11..13)?, field(14..16)?, field(17..19)?)?;
    Some(NaiveDateTime::new(date, time).and_utc().timestamp())
}

/// The `CREATED_ON_DATE` and `CREATED_ON_TS` values for a Unix timestamp.
pub fn format_created_on(unix_secs: i64) -> Option<(String, String)> {
    let dt: DateTime<Utc> = DateTime::from_timestamp(unix_secs, 0)?;
    Some((
        dt.format("%Y-%m-%d").to_string(),
        dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
    ))
}

/// Parse a `CREATED_ON_TS` value (ISO-8601 with offset).
pub fn parse_created_on_ts(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.timestamp())
}

/// Parse a `CREATED_ON_DATE` value as midnight UTC.
pub fn parse_created_on_date(value: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}
