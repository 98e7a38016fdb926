//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts positive and finite)
//! - Check the log filter and metrics address parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CoordinatorConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::CoordinatorConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("lifecycle.name must not be empty")]
    EmptyName,
    #[error("{field} must be a positive number of seconds, got {value}")]
    InvalidTimeout { field: &'static str, value: f64 },
    #[error("observability.log_level '{0}' is not a valid filter")]
    InvalidLogLevel(String),
    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &CoordinatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let lifecycle = &config.lifecycle;

    if lifecycle.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    for (field, value) in [
        ("lifecycle.startup_timeout_secs", lifecycle.startup_timeout_secs),
        ("lifecycle.teardown_timeout_secs", lifecycle.teardown_timeout_secs),
    ] {
        // Duration::from_secs_f64 panics on negative, NaN or overflowing input.
        if !(value.is_finite() && value > 0.0 && value < u64::MAX as f64) {
            errors.push(ValidationError::InvalidTimeout { field, value });
        }
    }

    let obs = &config.observability;
    if EnvFilter::try_new(&obs.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(obs.log_level.clone()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
