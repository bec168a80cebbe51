//! Time utility functions

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;

/// Check a datetime literal: RFC 3339 / ISO 8601, or `YYYY-MM-DD HH:MM[:SS[.f]]`
pub fn is_datetime_literal(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").is_ok()
}

/// Check a calendar date literal (`YYYY-MM-DD`)
pub fn is_date_literal(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Check a time-of-day literal (`HH:MM` or `HH:MM:SS[.f]`)
pub fn is_time_literal(s: &str) -> bool {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok()
        || NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}

/// Parse an IANA timezone name (e.g. `Europe/Berlin`)
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.parse::<Tz>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_literal_formats() {
        assert!(is_datetime_literal("2024-01-01T00:00:00Z"));
        assert!(is_datetime_literal("2024-01-01T08:30:00+02:00"));
        assert!(is_datetime_literal("2024-01-01 08:30:00"));
        assert!(is_datetime_literal("2024-01-01 08:30:00.125"));
        assert!(is_datetime_literal("2024-01-01 08:30"));
        assert!(!is_datetime_literal("2024-01-01"));
        assert!(!is_datetime_literal("yesterday"));
    }

    #[test]
    fn test_date_literal() {
        assert!(is_date_literal("2024-02-29"));
        assert!(!is_date_literal("2023-02-29"));
        assert!(!is_date_literal("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_time_literal() {
        assert!(is_time_literal("09:00"));
        assert!(is_time_literal("23:59:59"));
        assert!(is_time_literal("08:15:00.5"));
        assert!(!is_time_literal("25:00"));
        assert!(!is_time_literal("9am"));
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("UTC"), Some(chrono_tz::UTC));
        assert_eq!(
            parse_timezone("America/New_York"),
            Some(chrono_tz::America::New_York)
        );
        assert_eq!(parse_timezone("Invalid/Zone"), None);
        assert_eq!(parse_timezone(""), None);
    }
}
