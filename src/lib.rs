//! Process lifecycle coordinator.
//!
//! Sequences a single startup action under a timeout, traps SIGTERM/SIGINT
//! and panics, and runs a single teardown action exactly once before ending
//! the process with a status derived from why teardown happened.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::CoordinatorConfig;
pub use error::{BoxError, LifecycleError, Stage};
pub use lifecycle::{
    Coordinator, ExitStatus, FailureReason, LifecycleHandle, Phase, ProcessExit, Signal, Terminator,
};
pub use observability::{LogSink, TracingSink};
