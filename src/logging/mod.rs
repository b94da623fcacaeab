//! Structured logging via the `tracing` crate.
//!
//! Provides level-based filtering with per-module overrides and an
//! idempotent initializer safe to call from any embedding host. The
//! engine itself never installs a subscriber implicitly; hosts that
//! already configure `tracing` can skip this module entirely.

use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Log level for the detection engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration for tracing initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    pub default_level: LogLevel,
    pub module_filters: Vec<(String, LogLevel)>,
    pub show_targets: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            module_filters: vec![
                ("warden_core::engine".to_string(), LogLevel::Info),
                ("warden_core::checks".to_string(), LogLevel::Warn),
                ("warden_core::analytics".to_string(), LogLevel::Info),
            ],
            show_targets: true,
        }
    }
}

impl TracingConfig {
    pub fn to_env_filter_string(&self) -> String {
        let mut parts = vec![self.default_level.as_str().to_string()];
        for (module, level) in &self.module_filters {
            parts.push(format!("{}={}", module, level.as_str()));
        }
        parts.join(",")
    }
}

static TRACING_INIT: Once = Once::new();

/// Initializes tracing with default settings. Idempotent.
pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Initializes tracing with a custom config. Idempotent; the first call
/// wins, and an already-installed global subscriber is left in place.
pub fn init_tracing(config: &TracingConfig) {
    let filter_str = config.to_env_filter_string();
    let show_targets = config.show_targets;
    TRACING_INIT.call_once(move || {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(show_targets)
            .compact();

        let _ = subscriber.try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_as_str() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }

    #[test]
    fn test_env_filter_string() {
        let config = TracingConfig::default();
        let filter = config.to_env_filter_string();
        assert!(filter.starts_with("info"));
        assert!(filter.contains("warden_core::checks=warn"));
    }

    #[test]
    fn test_custom_filter_string() {
        let config = TracingConfig {
            default_level: LogLevel::Debug,
            module_filters: vec![("my_module".to_string(), LogLevel::Trace)],
            show_targets: false,
        };
        let filter = config.to_env_filter_string();
        assert!(filter.starts_with("debug"));
        assert!(filter.contains("my_module=trace"));
    }

    #[test]
    fn test_init_tracing_idempotent() {
        init_tracing_default();
        init_tracing_default();
        init_tracing(&TracingConfig::default());
    }
}
