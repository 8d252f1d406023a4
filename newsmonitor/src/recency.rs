use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::info;

use crate::error::{MonitorError, Result};
use crate::model::Entry;

/// Offset-carrying layouts tried after RFC 2822 and RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
];

/// Layouts without an offset; these are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
];

/// Cutoff instant for a run started at `now`. Fails when the lookback does
/// not fit chrono's range instead of wrapping or panicking.
pub fn threshold(now: DateTime<Utc>, lookback_hours: u64) -> Result<DateTime<Utc>> {
    i64::try_from(lookback_hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|lookback| now.checked_sub_signed(lookback))
        .ok_or(MonitorError::InvalidLookback(lookback_hours))
}

/// Parse a feed timestamp leniently (RFC 2822, ISO 8601 and common variants).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // chrono's RFC 2822 parser knows GMT/UT but not the literal "UTC" zone
    if let Some(head) = s.strip_suffix(" UTC") {
        if let Ok(dt) = DateTime::parse_from_rfc2822(&format!("{} +0000", head)) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(MonitorError::DateParse(raw.to_string()))
}

/// True iff the entry carries a timestamp strictly later than `threshold`.
/// Missing and unparseable timestamps are never recent.
pub fn is_recent(entry: &Entry, threshold: DateTime<Utc>) -> bool {
    let published = match entry.published.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => return false,
    };

    match parse_timestamp(published) {
        Ok(instant) => instant > threshold,
        Err(e) => {
            info!(link = %entry.link, "Date parse failed: {}", e);
            false
        }
    }
}
