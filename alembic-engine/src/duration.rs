//! ISO-8601 style duration parsing for proxy warm-up and command timeouts.
//!
//! Accepted grammar: `P[nY][nM][nD][T][nH][nM][nS]`, each magnitude a
//! possibly fractional number. A year counts as 365 days and a month as 30.

use std::sync::LazyLock;
use std::time::Duration;

use regex_lite::Regex;
use tracing::warn;

use crate::error::{EngineError, EngineResult};

/// Warm-up applied when no proxy sleep is configured.
pub const DEFAULT_PROXY_SLEEP: Duration = Duration::from_secs(5);

const SECS_PER_MINUTE: f64 = 60.0;
const SECS_PER_HOUR: f64 = 60.0 * SECS_PER_MINUTE;
const SECS_PER_DAY: f64 = 24.0 * SECS_PER_HOUR;
const SECS_PER_MONTH: f64 = 30.0 * SECS_PER_DAY;
const SECS_PER_YEAR: f64 = 365.0 * SECS_PER_DAY;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P([\d.]+Y)?([\d.]+M)?([\d.]+D)?T?([\d.]+H)?([\d.]+M)?([\d.]+S)?$")
        .expect("duration pattern is valid")
});

/// Components in capture-group order with their unit in seconds.
const UNITS: [f64; 6] = [
    SECS_PER_YEAR,
    SECS_PER_MONTH,
    SECS_PER_DAY,
    SECS_PER_HOUR,
    SECS_PER_MINUTE,
    1.0,
];

/// Parse a duration string.
///
/// An empty string yields [`DEFAULT_PROXY_SLEEP`]. Components whose magnitude
/// is not a valid number contribute nothing, and so does a string that does
/// not follow the grammar at all; use [`validate_duration`] to reject those
/// before they reach this function.
pub fn parse_duration(input: &str) -> Duration {
    let input = input.trim();
    if input.is_empty() {
        return DEFAULT_PROXY_SLEEP;
    }

    let Some(captures) = DURATION_RE.captures(input) else {
        warn!(duration = input, "duration does not match grammar, using zero");
        return Duration::ZERO;
    };

    UNITS
        .iter()
        .enumerate()
        .filter_map(|(idx, unit)| {
            captures
                .get(idx + 1)
                .map(|part| parse_component(part.as_str(), *unit))
        })
        .fold(Duration::ZERO, Duration::saturating_add)
}

/// Parse an optional duration, falling back to [`DEFAULT_PROXY_SLEEP`].
pub fn parse_optional(input: Option<&str>) -> Duration {
    input.map(parse_duration).unwrap_or(DEFAULT_PROXY_SLEEP)
}

/// Check that a duration string follows the accepted grammar.
pub fn validate_duration(input: &str) -> EngineResult<()> {
    let input = input.trim();
    if input.is_empty() || DURATION_RE.is_match(input) {
        Ok(())
    } else {
        Err(EngineError::configuration(format!(
            "duration '{}' must be in the format 'P[nY][nM][nD][T][nH][nM][nS]' (e.g. 'PT5S')",
            input
        )))
    }
}

/// Convert one `<number><designator>` fragment to a duration.
fn parse_component(fragment: &str, unit_secs: f64) -> Duration {
    let magnitude = &fragment[..fragment.len() - 1];
    match magnitude.parse::<f64>() {
        Ok(value) => Duration::try_from_secs_f64(value * unit_secs).unwrap_or_else(|_| {
            warn!(fragment, "duration component out of range, ignoring");
            Duration::ZERO
        }),
        Err(_) => {
            warn!(fragment, "malformed duration component, ignoring");
            Duration::ZERO
        }
    }
}
