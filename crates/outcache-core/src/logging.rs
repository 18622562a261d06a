//! Structured logging initialisation.
//!
//! Sets up a `tracing-subscriber` registry with an `EnvFilter` and either a
//! human-readable or a JSON formatting layer.

#[cfg(feature = "logging")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::OutcacheResult;
use serde::{Deserialize, Serialize};

/// Default filter directives when neither `RUST_LOG` nor a level is set.
pub const DEFAULT_LOG_FILTER: &str = "info,outcache=debug,tower_http=debug";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Builds the filter directives for a configured level.
///
/// A bare level such as `warn` keeps the outcache and tower-http targets at
/// that level too; anything containing `=` or `,` is taken verbatim.
#[must_use]
pub fn filter_directives(level: Option<&str>) -> String {
    match level.map(str::trim).filter(|level| !level.is_empty()) {
        None => DEFAULT_LOG_FILTER.to_string(),
        Some(level) if level.contains('=') || level.contains(',') => level.to_string(),
        Some(level) => format!("{level},outcache={level},tower_http={level}"),
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over `level` when set.
#[cfg(feature = "logging")]
pub fn init_logging(level: Option<&str>, format: LogFormat) -> OutcacheResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directives(level)))
        .map_err(|e| crate::OutcacheError::configuration(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
    };

    result.map_err(|e| crate::OutcacheError::internal(format!("Failed to install subscriber: {}", e)))
}

/// Placeholder for when the logging feature is disabled.
#[cfg(not(feature = "logging"))]
pub fn init_logging(_level: Option<&str>, _format: LogFormat) -> OutcacheResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(filter_directives(None), DEFAULT_LOG_FILTER);
        assert_eq!(filter_directives(Some("  ")), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_bare_level_applies_to_own_targets() {
        assert_eq!(
            filter_directives(Some("warn")),
            "warn,outcache=warn,tower_http=warn"
        );
    }

    #[test]
    fn test_full_directives_are_kept() {
        assert_eq!(
            filter_directives(Some("info,outcache_rest=trace")),
            "info,outcache_rest=trace"
        );
    }

    #[test]
    fn test_log_format_deserializes_lowercase() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }
}
