//! Date parsing for RFC 2822 style header values.

use chrono::{DateTime, FixedOffset};

/// The standard `Date:` header shape: `Mon, 1 Jan 2024 09:00:00 +0000`.
const PRIMARY_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Variants observed in the wild: missing seconds, missing weekday, both.
const FALLBACK_FORMATS: [&str; 3] = [
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
];

/// Parses a `Date:` header value, trying the standard format first and
/// then the common degenerate variants. Returns `None` when nothing
/// matches; callers treat an unparsable date as absent.
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, PRIMARY_FORMAT)
        .ok()
        .or_else(|| {
            FALLBACK_FORMATS
                .iter()
                .find_map(|format| DateTime::parse_from_str(value, format).ok())
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn test_standard_format() {
        let date = parse_date("Mon, 1 Jan 2024 09:00:00 +0000").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-01-01T09:00:00+00:00");
    }

    #[test]
    fn test_two_digit_day() {
        let date = parse_date("Thu, 15 Jun 2023 10:30:00 +0200").unwrap();
        assert_eq!(date.to_rfc3339(), "2023-06-15T10:30:00+02:00");
    }

    #[test]
    fn test_missing_seconds() {
        let date = parse_date("Thu, 15 Jun 2023 10:30 +0200").unwrap();
        assert_eq!(date.second(), 0);
        assert_eq!(date.minute(), 30);
    }

    #[test]
    fn test_missing_weekday() {
        let date = parse_date("15 Jun 2023 10:30:00 +0200").unwrap();
        assert_eq!(date.to_rfc3339(), "2023-06-15T10:30:00+02:00");
    }

    #[test]
    fn test_missing_weekday_and_seconds() {
        let date = parse_date("15 Jun 2023 10:30 +0200").unwrap();
        assert_eq!(date.to_rfc3339(), "2023-06-15T10:30:00+02:00");
    }

    #[test]
    fn test_offset_preserved() {
        let date = parse_date("Mon, 1 Jan 2024 14:30:00 +0530").unwrap();
        assert_eq!(date.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
    }

    #[test]
    fn test_unparsable_is_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2024-01-01T09:00:00Z"), None);
    }
}
