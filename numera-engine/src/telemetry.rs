//! Tracing subscriber initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` (`RUST_LOG`,
//! falling back to the configured default) and human or JSON output.

use numera_core::ConfigError;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" | "human" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue {
                field: "NUMERA_LOG_FORMAT".to_string(),
                value: other.to_string(),
                reason: "expected 'pretty' or 'json'".to_string(),
            }),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    pub log_format: LogFormat,
    /// Filter used when `RUST_LOG` is unset or invalid
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: std::env::var("NUMERA_SERVICE_NAME")
                .unwrap_or_else(|_| "numera".to_string()),
            log_format: std::env::var("NUMERA_LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            default_filter: "numera=info".to_string(),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Fails instead of panicking when a global subscriber is already set.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), ConfigError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| ConfigError::Telemetry {
        reason: e.to_string(),
    })?;

    tracing::info!(
        service_name = %config.service_name,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_telemetry_config_default_filter() {
        let config = TelemetryConfig::default();
        assert_eq!(config.default_filter, "numera=info");
        assert!(!config.service_name.is_empty());
    }

    #[test]
    fn test_second_init_fails_without_panicking() {
        let config = TelemetryConfig {
            service_name: "numera-test".to_string(),
            log_format: LogFormat::Pretty,
            default_filter: "numera=debug".to_string(),
        };
        // The first call may lose to another test that already installed a
        // subscriber; the second always finds one.
        let _ = init_tracing(&config);
        let err = init_tracing(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Telemetry { .. }));
    }
}
