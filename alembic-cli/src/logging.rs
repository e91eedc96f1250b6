//! Logging setup for the provider host.
//!
//! Structured logging is off unless requested through the environment:
//!
//! - `ALEMBIC_PROVIDER_DEBUG=true|1|yes` - Enable debug logging
//! - `ALEMBIC_PROVIDER_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `ALEMBIC_PROVIDER_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! Logs go to stderr so they never mix with command output.

use std::env;
use std::sync::Once;

/// Enables debug logging
pub const DEBUG_VAR: &str = "ALEMBIC_PROVIDER_DEBUG";

/// Overrides the log level
pub const LEVEL_VAR: &str = "ALEMBIC_PROVIDER_LOG_LEVEL";

/// Selects the log format
pub const FORMAT_VAR: &str = "ALEMBIC_PROVIDER_LOG_FORMAT";

static INIT: Once = Once::new();

fn debug_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

fn level_from(level: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match level.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

fn format_from(format: Option<&str>) -> &'static str {
    match format.map(str::to_lowercase).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// Whether `ALEMBIC_PROVIDER_DEBUG` is set to a truthy value.
pub fn is_debug_enabled() -> bool {
    debug_flag(env::var(DEBUG_VAR).ok().as_deref())
}

/// Configured level, defaulting to `debug` in debug mode and `warn` otherwise.
pub fn get_log_level() -> &'static str {
    level_from(env::var(LEVEL_VAR).ok().as_deref(), is_debug_enabled())
}

/// Configured format, defaulting to `json`.
pub fn get_log_format() -> &'static str {
    format_from(env::var(FORMAT_VAR).ok().as_deref())
}

/// Install the global subscriber. Subsequent calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
            return;
        }

        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let level = get_log_level();
        let filter = EnvFilter::try_new(format!(
            "alembic_engine={},alembic_cli={},alembic_provider={}",
            level, level, level
        ))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

        let layer = fmt::layer().with_writer(std::io::stderr);
        let installed = match get_log_format() {
            "pretty" => tracing_subscriber::registry()
                .with(filter)
                .with(layer.pretty())
                .try_init(),
            "compact" => tracing_subscriber::registry()
                .with(filter)
                .with(layer.compact())
                .try_init(),
            _ => tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .try_init(),
        };

        if installed.is_ok() {
            tracing::info!(level = level, format = get_log_format(), "logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag() {
        assert!(debug_flag(Some("TRUE")));
        assert!(debug_flag(Some("1")));
        assert!(debug_flag(Some("yes")));
        assert!(!debug_flag(Some("0")));
        assert!(!debug_flag(None));
    }

    #[test]
    fn test_level_defaults() {
        assert_eq!(level_from(None, false), "warn");
        assert_eq!(level_from(None, true), "debug");
        assert_eq!(level_from(Some("bogus"), false), "warn");
        assert_eq!(level_from(Some("INFO"), false), "info");
        assert_eq!(level_from(Some("trace"), true), "trace");
    }

    #[test]
    fn test_format_defaults_to_json() {
        assert_eq!(format_from(None), "json");
        assert_eq!(format_from(Some("Pretty")), "pretty");
        assert_eq!(format_from(Some("compact")), "compact");
        assert_eq!(format_from(Some("xml")), "json");
    }
}
