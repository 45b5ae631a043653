//! Tracing subscriber setup.

use fusion_core::{FusionError, FusionResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "fusion_client=debug,fusion_storage=debug,info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; anything else is human-readable.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Output format of the fmt layer
    pub log_format: LogFormat,
    /// EnvFilter directives used when `RUST_LOG` is absent
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: std::env::var("FUSION_SERVICE_NAME")
                .unwrap_or_else(|_| "fusion-client".to_string()),
            log_format: std::env::var("FUSION_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(LogFormat::Pretty),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. A second call fails because a global subscriber is
/// already set.
pub fn init_tracing(config: &TelemetryConfig) -> FusionResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .try_init()
        .map_err(|e| FusionError::Telemetry {
            reason: format!("Failed to init subscriber: {}", e),
        })?;

    tracing::info!(
        service_name = config.service_name,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
    }

    #[test]
    fn test_default_filter_targets_fusion_crates() {
        let config = TelemetryConfig {
            service_name: "test".to_string(),
            log_format: LogFormat::Pretty,
            default_filter: DEFAULT_FILTER.to_string(),
        };
        assert!(config.default_filter.contains("fusion_storage=debug"));
        assert!(EnvFilter::try_new(&config.default_filter).is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig {
            service_name: "test".to_string(),
            log_format: LogFormat::Json,
            default_filter: "off".to_string(),
        };
        // The first call may lose to another test that already installed a
        // subscriber; the second one always fails.
        let _ = init_tracing(&config);
        let err = init_tracing(&config).unwrap_err();
        assert!(matches!(err, FusionError::Telemetry { .. }));
    }
}
