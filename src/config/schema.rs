//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so an empty file is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the coordinator binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Startup/teardown bounds and trap settings.
    pub lifecycle: LifecycleConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Lifecycle settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Process/component name used to scope the default log sink.
    pub name: String,

    /// Bound on startup completion, in seconds.
    pub startup_timeout_secs: f64,

    /// Bound on teardown completion, and on waiting for startup to settle
    /// during signal-triggered shutdown, in seconds.
    pub teardown_timeout_secs: f64,

    /// Trap SIGTERM/SIGINT.
    pub handle_signals: bool,

    /// Treat panics anywhere in the process as unrecovered faults.
    pub trap_panics: bool,
}

impl LifecycleConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.startup_timeout_secs)
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.teardown_timeout_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            name: "process".to_string(),
            startup_timeout_secs: 20.0,
            teardown_timeout_secs: 10.0,
            handle_signals: true,
            trap_panics: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info", "lifecycle_coordinator=debug").
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
