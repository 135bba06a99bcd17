use chrono::{DateTime, NaiveDateTime, Utc};

/// Formats seen in the wild that are neither RFC 2822 nor RFC 3339.
const FALLBACK_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a feed publish date into UTC.
///
/// Tries RFC 2822 (the RSS standard), then RFC 3339, then a handful of
/// zone-less layouts which are assumed to be UTC. Trailing zone names in
/// parentheses, e.g. `+0000 (UTC)`, are ignored.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = strip_zone_comment(raw.trim());
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let (body, zone) = split_zone_name(raw);
    if !zone.is_empty() && !zone.eq_ignore_ascii_case("UTC") && !zone.eq_ignore_ascii_case("GMT") {
        tracing::debug!(date = raw, zone, "Unknown zone name, assuming UTC");
    }

    FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(body, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn strip_zone_comment(raw: &str) -> &str {
    match raw.rfind(" (") {
        Some(idx) if raw.ends_with(')') => raw[..idx].trim_end(),
        _ => raw,
    }
}

/// Split a trailing alphabetic zone token ("UTC", "EST") off the date body.
fn split_zone_name(raw: &str) -> (&str, &str) {
    match raw.rsplit_once(' ') {
        Some((body, zone)) if !zone.is_empty() && zone.chars().all(|c| c.is_ascii_alphabetic()) => {
            (body.trim_end(), zone)
        }
        _ => (raw, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc2822_with_offset() {
        let dt = parse_feed_date("Mon, 24 Feb 2014 05:57:39 +0100").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2014, 2, 24, 4, 57, 39).unwrap());
    }

    #[test]
    fn test_rfc2822_with_zone_comment() {
        let dt = parse_feed_date("Mon, 24 Feb 2014 05:57:39 +0000 (UTC)").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2014, 2, 24, 5, 57, 39).unwrap());
    }

    #[test]
    fn test_rfc3339() {
        let dt = parse_feed_date("2023-06-15T14:30:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2023, 6, 15, 14, 30, 0).unwrap());
    }

    #[test]
    fn test_zone_less_assumes_utc() {
        let dt = parse_feed_date("2006-01-02 15:04:05").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap());
    }

    #[test]
    fn test_trailing_zone_name() {
        let dt = parse_feed_date("Sat, 01 Mar 2014 12:00:00 UTC").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2014, 3, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_garbage() {
        assert!(parse_feed_date("").is_none());
        assert!(parse_feed_date("yesterday").is_none());
    }
}
