//! Environment-based configuration.

use std::fmt;
use std::sync::Arc;

use crate::handler::{AccessLogHandler, Handler, LogSink, Mode};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// Invalid value for an environment variable.
    Invalid { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, message } => {
                write!(f, "invalid value for {}: {}", key, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Get environment variable with default value.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse environment variable as boolean.
/// Treats "1", "true" (case-insensitive) as true.
pub fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(default)
}

/// Logging configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log level filter (from LOG_LEVEL or RUST_LOG).
    pub filter: String,
    /// Service name for structured logging.
    pub service_name: String,
}

impl LoggingConfig {
    /// Load configuration from environment variables.
    ///
    /// Priority: LOG_LEVEL > RUST_LOG > default
    ///
    /// LOG_LEVEL accepts simple values: trace, debug, info, warn, error.
    /// RUST_LOG accepts full tracing filter syntax.
    pub fn from_env() -> Self {
        Self {
            filter: Self::resolve_log_filter(),
            service_name: env_or("SERVICE_NAME", "accesslog"),
        }
    }

    fn resolve_log_filter() -> String {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            let level = level.to_lowercase();
            match level.as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => return level,
                _ => {
                    eprintln!(
                        "Warning: Invalid LOG_LEVEL '{}', expected: trace, debug, info, warn, error",
                        level
                    );
                }
            }
        }

        if let Ok(filter) = std::env::var("RUST_LOG") {
            return filter;
        }

        "info".to_string()
    }
}

/// Access log configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct AccessLogConfig {
    /// Whether exchanges are logged at all.
    pub enabled: bool,
    /// Emission mode, see [`Mode`].
    pub mode: Mode,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: Mode::Finalize,
        }
    }
}

impl AccessLogConfig {
    /// Load from `ACCESSLOG_ENABLED` and `ACCESSLOG_MODE`
    /// (`finalize` | `around`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = env_or("ACCESSLOG_MODE", "finalize")
            .parse::<Mode>()
            .map_err(|message| ConfigError::Invalid {
                key: "ACCESSLOG_MODE".to_string(),
                message,
            })?;

        Ok(Self {
            enabled: env_bool("ACCESSLOG_ENABLED", true),
            mode,
        })
    }

    /// Wrap `inner` per this configuration: a logging dispatch handler in
    /// the configured mode, or `inner` untouched when disabled.
    pub fn apply(&self, inner: Box<dyn Handler>, sink: Arc<dyn LogSink>) -> Box<dyn Handler> {
        if !self.enabled {
            return inner;
        }
        Box::new(AccessLogHandler::with_mode(inner, sink, self.mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or() {
        std::env::remove_var("ACCESSLOG_TEST_MISSING");
        assert_eq!(env_or("ACCESSLOG_TEST_MISSING", "fallback"), "fallback");

        std::env::set_var("ACCESSLOG_TEST_PRESENT", "value");
        assert_eq!(env_or("ACCESSLOG_TEST_PRESENT", "fallback"), "value");
        std::env::remove_var("ACCESSLOG_TEST_PRESENT");
    }

    #[test]
    fn test_env_bool() {
        std::env::remove_var("ACCESSLOG_TEST_BOOL");
        assert!(env_bool("ACCESSLOG_TEST_BOOL", true));
        assert!(!env_bool("ACCESSLOG_TEST_BOOL", false));

        std::env::set_var("ACCESSLOG_TEST_BOOL", "1");
        assert!(env_bool("ACCESSLOG_TEST_BOOL", false));

        std::env::set_var("ACCESSLOG_TEST_BOOL", "TRUE");
        assert!(env_bool("ACCESSLOG_TEST_BOOL", false));

        std::env::set_var("ACCESSLOG_TEST_BOOL", "no");
        assert!(!env_bool("ACCESSLOG_TEST_BOOL", true));
        std::env::remove_var("ACCESSLOG_TEST_BOOL");
    }

    #[test]
    fn test_logging_config_filter_resolution() {
        // Single test so the LOG_LEVEL/RUST_LOG mutations never race.
        std::env::remove_var("LOG_LEVEL");
        std::env::remove_var("RUST_LOG");
        std::env::remove_var("SERVICE_NAME");

        let config = LoggingConfig::from_env();
        assert_eq!(config.filter, "info");
        assert_eq!(config.service_name, "accesslog");

        std::env::set_var("RUST_LOG", "accesslog=warn");
        assert_eq!(LoggingConfig::from_env().filter, "accesslog=warn");

        // LOG_LEVEL takes priority over RUST_LOG.
        std::env::set_var("LOG_LEVEL", "debug");
        assert_eq!(LoggingConfig::from_env().filter, "debug");

        std::env::remove_var("LOG_LEVEL");
        std::env::remove_var("RUST_LOG");
    }

    #[test]
    fn test_access_log_config_default() {
        let config = AccessLogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.mode, Mode::Finalize);
    }

    #[test]
    fn test_from_env_defaults() {
        // No ACCESSLOG_* variables set anywhere in the test suite.
        let config = AccessLogConfig::from_env().unwrap();
        assert!(config.enabled);
        assert_eq!(config.mode, Mode::Finalize);
    }

    #[test]
    fn test_mode_parse_rejected() {
        let err = "sometimes".parse::<Mode>().unwrap_err();
        assert!(err.contains("sometimes"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            key: "ACCESSLOG_MODE".to_string(),
            message: "unknown access log mode: x".to_string(),
        };
        assert!(err.to_string().contains("ACCESSLOG_MODE"));
    }
}
