//! Date coercion for calendar booking
//!
//! Proposals arrive with whatever date text the extraction step produced.
//! The calendar API wants ISO-8601, so anything already shaped like
//! `YYYY-MM-DDTHH:MM:SS` passes through untouched and everything else is
//! parsed and re-serialized as a UTC instant.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Result, SecrelyError};

static ISO_PREFIX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").ok());

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %H:%M",
    "%b %d, %Y %I:%M %p",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];

/// Returns `value` unchanged when it already starts with an ISO-8601
/// date-time, otherwise parses it and returns a UTC ISO-8601 instant.
///
/// Inputs without an offset are read as wall-clock time in `tz`; bare dates
/// mean midnight UTC. Unparsable input fails with
/// [`SecrelyError::InvalidDate`].
pub fn ensure_iso_format(value: &str, tz: Tz) -> Result<String> {
    if ISO_PREFIX.as_ref().is_some_and(|re| re.is_match(value)) {
        return Ok(value.to_string());
    }
    parse_instant(value.trim(), tz)
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| SecrelyError::InvalidDate(format!("'{value}' is not a recognizable date")))
}

fn parse_instant(value: &str, tz: Tz) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return localize(naive, tz);
        }
    }
    NAIVE_DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    })
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Picks the zone used for booking and agent context: the configured IANA
/// name if valid, then `$TZ`, then UTC.
pub fn resolve_timezone(configured: Option<&str>) -> Tz {
    configured
        .and_then(|name| name.trim().parse::<Tz>().ok())
        .or_else(|| std::env::var("TZ").ok().and_then(|name| name.trim().parse::<Tz>().ok()))
        .unwrap_or(Tz::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_input_is_returned_verbatim() {
        for value in ["2025-03-07T10:00:00", "2025-03-07T10:00:00-05:00", "2025-03-07T10:00:00.000Z"]
        {
            assert_eq!(ensure_iso_format(value, Tz::UTC).unwrap(), value);
        }
    }

    #[test]
    fn rfc2822_is_converted_to_same_instant() {
        let iso = ensure_iso_format("Fri, 07 Mar 2025 10:00:00 +0100", Tz::UTC).unwrap();
        assert_eq!(iso, "2025-03-07T09:00:00.000Z");
        let reparsed = DateTime::parse_from_rfc3339(&iso).unwrap();
        let original = DateTime::parse_from_rfc2822("Fri, 07 Mar 2025 10:00:00 +0100").unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn naive_input_uses_supplied_zone() {
        let iso = ensure_iso_format("2025-03-07 10:00", chrono_tz::America::New_York).unwrap();
        assert_eq!(iso, "2025-03-07T15:00:00.000Z");

        let iso = ensure_iso_format("March 7, 2025 2:30 PM", Tz::UTC).unwrap();
        assert_eq!(iso, "2025-03-07T14:30:00.000Z");
    }

    #[test]
    fn converted_output_passes_through_unchanged() {
        let once = ensure_iso_format("03/07/2025 09:15", Tz::UTC).unwrap();
        assert_eq!(ensure_iso_format(&once, Tz::UTC).unwrap(), once);
    }

    #[test]
    fn garbage_is_invalid_date() {
        assert!(matches!(
            ensure_iso_format("next tuesday-ish", Tz::UTC),
            Err(SecrelyError::InvalidDate(_))
        ));
        assert!(matches!(ensure_iso_format("", Tz::UTC), Err(SecrelyError::InvalidDate(_))));
    }

    #[test]
    fn configured_zone_wins() {
        assert_eq!(resolve_timezone(Some("Europe/Berlin")), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn invalid_configured_zone_falls_back() {
        let tz = resolve_timezone(Some("Mars/Olympus"));
        assert_ne!(tz.name(), "Mars/Olympus");
    }
}
