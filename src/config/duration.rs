//! # Duration Parsing
//!
//! Parses duration flags such as `500ms`, `30s`, `1m` or `1h30m`.

use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static DURATION_FORMAT: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(?:\d+(?:ms|s|m|h|d))+$"));

static DURATION_SEGMENT: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?P<number>\d+)(?P<unit>ms|s|m|h|d)"));

/// Parse a duration string into a [`Duration`]
///
/// Accepts one or more `<number><unit>` segments where unit is one of
/// `ms`, `s`, `m`, `h`, `d`. The total must be greater than zero.
///
/// # Errors
/// Returns an error if the string is empty, malformed, overflows or is zero
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    let duration_trimmed = duration_str.trim();

    if duration_trimmed.is_empty() {
        return Err(anyhow::anyhow!("Duration string cannot be empty"));
    }

    let format = DURATION_FORMAT
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;
    let segment = DURATION_SEGMENT
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    let interval_lower = duration_trimmed.to_lowercase();
    if !format.is_match(&interval_lower) {
        return Err(anyhow::anyhow!(
            "Invalid duration format '{}'. Expected format: <number><unit> (e.g., '500ms', '30s', '1m', '1h30m')",
            duration_trimmed
        ));
    }

    let mut total_ms: u64 = 0;
    for captures in segment.captures_iter(&interval_lower) {
        let number_str = captures.name("number").map_or("", |m| m.as_str());
        let unit = captures.name("unit").map_or("", |m| m.as_str());

        let number: u64 = number_str.parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid duration number '{}' in '{}': {}",
                number_str,
                duration_trimmed,
                e
            )
        })?;

        let unit_ms: u64 = match unit {
            "ms" => 1,
            "s" => 1000,
            "m" => 60 * 1000,
            "h" => 3600 * 1000,
            "d" => 86400 * 1000,
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid unit '{}' in duration '{}'. Expected: ms, s, m, h, or d",
                    unit,
                    duration_trimmed
                ));
            }
        };

        total_ms = number
            .checked_mul(unit_ms)
            .and_then(|ms| total_ms.checked_add(ms))
            .ok_or_else(|| anyhow::anyhow!("Duration '{duration_trimmed}' is too large"))?;
    }

    if total_ms == 0 {
        return Err(anyhow::anyhow!(
            "Duration must be greater than 0, got '{}'",
            duration_trimmed
        ));
    }

    Ok(Duration::from_millis(total_ms))
}
