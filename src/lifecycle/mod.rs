//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Coordinator::start (controller.rs):
//!     Arm signal/panic traps (signals.rs) → spawn startup (startup.rs)
//!
//! Startup (startup.rs):
//!     Yield once → guarded startup action → settled
//!     → success: Running
//!     → failure/timeout: teardown trigger
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → signal trigger
//!     panic anywhere → unrecovered fault trigger
//!
//! Controller (controller.rs):
//!     trigger → exit gate (first wins) → (traps) wait for startup to settle
//!     → teardown (shutdown.rs) → exit status → Terminator
//! ```
//!
//! # Design Decisions
//! - One startup action, one teardown action, per process lifetime
//! - Every wait is bounded; nothing is retried
//! - Teardown has timeout: exit status 2 after the deadline

pub mod controller;
pub mod shutdown;
pub(crate) mod signals;
pub mod startup;
pub mod state;

pub use controller::{Coordinator, LifecycleHandle};
pub use shutdown::{ProcessExit, TeardownAction, Terminator};
pub use startup::StartupAction;
pub use state::{ExitStatus, FailureReason, LifecycleState, Phase, Signal};
