//! Date parsing helpers
//!
//! Publication dates come from the data source in a handful of ISO-8601 shapes.
//! Observation dates in the event log are compared timezone-naive.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const PUBLISHED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%MZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

const OBSERVED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a data-source publication date (UTC assumed when no offset is given)
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    PUBLISHED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| date_only(raw))
        .map(|naive| naive.and_utc())
}

/// Parse an event-log observation date into a naive timestamp
pub fn parse_observed(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    OBSERVED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| date_only(raw))
}

fn date_only(raw: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Whole days from `earlier` to `later`, rounded toward negative infinity
pub fn days_between(later: NaiveDateTime, earlier: NaiveDateTime) -> i64 {
    (later - earlier).num_seconds().div_euclid(86_400)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_published_formats() {
        assert!(parse_published("2019-03-21T16:01Z").is_some());
        assert!(parse_published("2019-03-21T16:01:05.123Z").is_some());
        assert!(parse_published("2019-03-21T16:01:05+02:00").is_some());
        assert!(parse_published("2019-03-21").is_some());
        assert!(parse_published("yesterday").is_none());
    }

    #[test]
    fn test_parse_observed_formats() {
        let a = parse_observed("2020-05-01").unwrap();
        let b = parse_observed("2020-05-01 00:00:00").unwrap();
        let c = parse_observed("2020-05-01T00:00:00Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(parse_observed("05/01/2020").is_none());
    }

    #[test]
    fn test_days_between_floors() {
        let a = parse_observed("2020-05-10 12:00:00").unwrap();
        let b = parse_observed("2020-05-01 00:00:00").unwrap();
        assert_eq!(days_between(a, b), 9);
        assert_eq!(days_between(b, a), -10);
    }
}
