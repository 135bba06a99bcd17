use std::num::ParseIntError;

/// Vote scale used by sources that report 1..10 quality ratings.
pub const DEFAULT_RATING_CEILING: u32 = 10;

/// Sources print a dash for "no data yet".
fn is_absent(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw == "-"
}

/// Parse an up/down vote counter. Absent values stay absent; they are not
/// zero votes.
pub fn parse_vote_count(raw: Option<&str>) -> Result<Option<u32>, ParseIntError> {
    match raw {
        Some(raw) if !is_absent(raw) => raw.trim().parse().map(Some),
        _ => Ok(None),
    }
}

/// Normalize a `1..=ceiling` rating onto `[0, 1]`.
///
/// A rating of 1 maps to 0.0 and `ceiling` maps to 1.0. Values outside the
/// scale are clamped.
pub fn parse_rating(raw: Option<&str>, ceiling: u32) -> Result<Option<f64>, ParseIntError> {
    let Some(raw) = raw.filter(|r| !is_absent(r)) else {
        return Ok(None);
    };

    let value: i64 = raw.trim().parse()?;
    let span = f64::from(ceiling.max(2) - 1);
    let normalized = (value - 1) as f64 / span;

    Ok(Some(normalized.clamp(0.0, 1.0)))
}

/// Sources confirm spam/passworded state with a literal `yes`.
pub fn parse_flag(raw: Option<&str>) -> bool {
    raw.is_some_and(|r| r.trim().eq_ignore_ascii_case("yes"))
}
