//! Structured logging.
//!
//! # Responsibilities
//! - Define the `LogSink` collaborator the coordinator reports through
//! - Provide the default name-scoped sink backed by `tracing`
//! - Initialize the global subscriber for binaries
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and `RUST_LOG`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};

/// Where the coordinator sends its operator-facing messages.
pub trait LogSink: Send + Sync + 'static {
    fn info(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Default sink: forwards to `tracing`, tagged with the component name.
#[derive(Debug, Clone)]
pub struct TracingSink {
    name: String,
}

impl TracingSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl LogSink for TracingSink {
    fn info(&self, msg: &str) {
        tracing::info!(component = %self.name, "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(component = %self.name, "{}", msg);
    }
}

/// Error raised when the global subscriber cannot be installed.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|source| LoggingError::Filter {
            filter: config.log_level.clone(),
            source,
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init()?,
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_sink_keeps_name() {
        let sink = TracingSink::new("billing-worker");
        assert_eq!(sink.name(), "billing-worker");
        // Without a subscriber these are no-ops; they must not panic.
        sink.info("startup complete");
        sink.error("startup failed: nope");
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = ObservabilityConfig {
            log_level: "lifecycle=loud".to_string(),
            ..ObservabilityConfig::default()
        };
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(matches!(init_logging(&config), Err(LoggingError::Filter { .. })));
        }
    }
}
