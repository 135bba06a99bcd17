use regex::Regex;
use std::sync::LazyLock;

pub const MEBIBYTE: u64 = 1024 * 1024;
pub const GIBIBYTE: u64 = 1024 * MEBIBYTE;

// ── Regex patterns (compiled once) ──────────────────────────────

/// Matches "350 MB", "1.37GiB", "1,024.50 MB" anywhere in a description.
static RE_REPORT_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<value>\d+\.\d{1,2}|\d+,\d+\.\d{1,2}|\d+)\W?(?P<unit>GB|MB|GiB|MiB)").unwrap()
});

/// Parse a human-readable size into bytes.
///
/// Only the first size-looking token is considered. Decimal units are
/// treated as binary (`GB` == `GiB`), which is what feed sources mean in
/// practice. Returns `0` when no size can be found.
pub fn parse_size(text: &str) -> u64 {
    let Some(caps) = RE_REPORT_SIZE.captures(text) else {
        return 0;
    };

    let raw_value = caps["value"].replace(',', "");
    let value: f64 = match raw_value.parse() {
        Ok(v) => v,
        Err(_) => return 0,
    };

    let multiplier = match caps["unit"].to_ascii_lowercase().as_str() {
        "mb" | "mib" => MEBIBYTE,
        "gb" | "gib" => GIBIBYTE,
        _ => return 0,
    };

    (value * multiplier as f64).round() as u64
}
