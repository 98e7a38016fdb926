//! Error taxonomy for the lifecycle coordinator.

use std::fmt;
use std::time::Duration;

use crate::lifecycle::state::Signal;

/// Error type returned by startup and teardown actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The guarded phase an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Startup,
    Teardown,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Startup => "startup",
            Stage::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The guarded action did not settle within its bound.
    #[error("{stage} timed out after {} sec", .limit.as_secs_f64())]
    Timeout { stage: Stage, limit: Duration },

    /// The action itself returned an error.
    #[error("{source}")]
    Action {
        stage: Stage,
        #[source]
        source: BoxError,
    },

    /// The action panicked while running.
    #[error("{stage} action panicked: {message}")]
    Panicked { stage: Stage, message: String },

    /// The runtime dropped the action task before it finished.
    #[error("{stage} action was cancelled by the runtime")]
    Cancelled { stage: Stage },

    /// A fault trapped at the process boundary.
    #[error("unrecovered fault: {message}")]
    Unrecovered { message: String },

    #[error("coordinator must be started inside a Tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    #[error("failed to install {signal} handler: {source}")]
    SignalInstall {
        signal: Signal,
        #[source]
        source: std::io::Error,
    },
}

impl LifecycleError {
    /// Whether this error is the timeout fault of the guard.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LifecycleError::Timeout { .. })
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            LifecycleError::Timeout { stage, .. }
            | LifecycleError::Action { stage, .. }
            | LifecycleError::Panicked { stage, .. }
            | LifecycleError::Cancelled { stage } => Some(*stage),
            LifecycleError::Unrecovered { .. }
            | LifecycleError::Runtime(_)
            | LifecycleError::SignalInstall { .. } => None,
        }
    }
}
