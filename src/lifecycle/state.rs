//! Shared lifecycle state.
//!
//! # States
//! - Starting: startup action in flight
//! - Running: startup settled successfully
//! - Exiting: a teardown trigger was accepted
//! - Terminated: process exit has been requested
//!
//! # State Transitions
//! ```text
//! Starting → Running: startup succeeded within its timeout
//! Starting → Exiting: startup failed, or any trigger accepted
//! Running  → Exiting: signal, unrecovered fault or explicit teardown
//! Exiting  → Terminated: teardown settled, exit status decided
//! ```
//!
//! # Design Decisions
//! - `exiting` flips false → true exactly once (compare-exchange)
//! - The exit reason is write-once; the first accepted trigger wins
//! - Phase changes are published on a watch channel for observers

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

use crate::error::LifecycleError;

/// Termination signals the coordinator intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Term,
    Int,
}

impl Signal {
    pub const ALL: [Signal; 2] = [Signal::Term, Signal::Int];

    pub fn name(&self) -> &'static str {
        match self {
            Signal::Term => "SIGTERM",
            Signal::Int => "SIGINT",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why teardown was triggered. `None` at the use sites means a normal exit.
#[derive(Debug, Clone)]
pub enum FailureReason {
    /// An external termination request.
    SignalAbort { signal: Signal },
    /// An error from startup, teardown, or an unrecovered fault.
    Fault {
        cause: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl FailureReason {
    pub fn signal(signal: Signal) -> Self {
        FailureReason::SignalAbort { signal }
    }

    pub fn fault<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FailureReason::Fault { cause: Arc::new(cause) }
    }

    /// The signal name, when this reason is a signal abort.
    pub fn signal_name(&self) -> Option<&'static str> {
        match self {
            FailureReason::SignalAbort { signal } => Some(signal.name()),
            FailureReason::Fault { .. } => None,
        }
    }

    pub fn is_signal(&self) -> bool {
        matches!(self, FailureReason::SignalAbort { .. })
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, FailureReason::Fault { .. })
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SignalAbort { signal } => write!(f, "received {}", signal),
            FailureReason::Fault { cause } => write!(f, "{}", cause),
        }
    }
}

impl From<LifecycleError> for FailureReason {
    fn from(err: LifecycleError) -> Self {
        FailureReason::fault(err)
    }
}

/// The one-line description used in the teardown log.
pub fn describe(reason: Option<&FailureReason>) -> String {
    match reason {
        Some(FailureReason::SignalAbort { signal }) => signal.name().to_string(),
        Some(FailureReason::Fault { cause }) => cause.to_string(),
        None => "normal exit".to_string(),
    }
}

/// Lifecycle phase.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Starting = 0,
    Running = 1,
    Exiting = 2,
    Terminated = 3,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::Exiting => "exiting",
            Phase::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Final process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Teardown ran for a normal exit and finished in time.
    Clean,
    /// Teardown ran for a failure or signal.
    Failure,
    /// Teardown did not finish within its bound.
    TeardownTimedOut,
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Clean => 0,
            ExitStatus::Failure => 1,
            ExitStatus::TeardownTimedOut => 2,
        }
    }

    /// Status implied by the reason when teardown completes within budget.
    pub fn for_reason(reason: Option<&FailureReason>) -> Self {
        match reason {
            None => ExitStatus::Clean,
            Some(_) => ExitStatus::Failure,
        }
    }
}

/// Process-wide lifecycle record, owned by the controller.
#[derive(Debug)]
pub struct LifecycleState {
    exiting: AtomicBool,
    /// Unset until a trigger is accepted; `Some(None)` is a normal exit.
    exit_reason: OnceLock<Option<FailureReason>>,
    exit_status: OnceLock<ExitStatus>,
    phase: watch::Sender<Phase>,
}

impl LifecycleState {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::Starting);
        Self {
            exiting: AtomicBool::new(false),
            exit_reason: OnceLock::new(),
            exit_status: OnceLock::new(),
            phase,
        }
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::Acquire)
    }

    /// Atomically flip `exiting`. Returns `true` only for the caller that won.
    pub(crate) fn try_begin_exit(&self) -> bool {
        let won = self
            .exiting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.phase.send_if_modified(|p| {
                if *p < Phase::Exiting {
                    *p = Phase::Exiting;
                    true
                } else {
                    false
                }
            });
        }
        won
    }

    /// Record the exit reason unless one was already recorded.
    pub(crate) fn record_reason(&self, reason: Option<FailureReason>) -> bool {
        self.exit_reason.set(reason).is_ok()
    }

    /// The recorded reason; `None` both before teardown and for a normal exit.
    pub fn exit_reason(&self) -> Option<FailureReason> {
        self.exit_reason.get().cloned().flatten()
    }

    /// Whether a reason (possibly "normal exit") has been recorded.
    pub fn has_exit_reason(&self) -> bool {
        self.exit_reason.get().is_some()
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status.get().copied()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Starting → Running. No effect once teardown began.
    pub(crate) fn mark_running(&self) -> bool {
        self.phase.send_if_modified(|p| {
            if *p == Phase::Starting {
                *p = Phase::Running;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn mark_terminated(&self, status: ExitStatus) {
        let _ = self.exit_status.set(status);
        self.phase.send_replace(Phase::Terminated);
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use std::time::Duration;

    #[test]
    fn test_exit_gate_flips_once() {
        let state = LifecycleState::new();
        assert!(!state.is_exiting());
        assert!(state.try_begin_exit());
        assert!(!state.try_begin_exit());
        assert!(state.is_exiting());
        assert_eq!(state.phase(), Phase::Exiting);
    }

    #[test]
    fn test_exit_reason_is_write_once() {
        let state = LifecycleState::new();
        assert!(!state.has_exit_reason());
        assert!(state.record_reason(Some(FailureReason::signal(Signal::Term))));
        assert!(!state.record_reason(Some(FailureReason::signal(Signal::Int))));
        assert!(!state.record_reason(None));
        assert_eq!(state.exit_reason().and_then(|r| r.signal_name()), Some("SIGTERM"));
    }

    #[test]
    fn test_normal_exit_reason_is_recorded_but_absent() {
        let state = LifecycleState::new();
        assert!(state.record_reason(None));
        assert!(state.has_exit_reason());
        assert!(state.exit_reason().is_none());
    }

    #[test]
    fn test_running_only_from_starting() {
        let state = LifecycleState::new();
        assert!(state.mark_running());
        assert_eq!(state.phase(), Phase::Running);
        assert!(state.try_begin_exit());
        assert!(!state.mark_running());
        assert_eq!(state.phase(), Phase::Exiting);
    }

    #[test]
    fn test_exit_status_codes() {
        assert_eq!(ExitStatus::for_reason(None).code(), 0);
        let fault = FailureReason::from(LifecycleError::Timeout {
            stage: Stage::Startup,
            limit: Duration::from_secs(20),
        });
        assert_eq!(ExitStatus::for_reason(Some(&fault)).code(), 1);
        assert_eq!(ExitStatus::for_reason(Some(&FailureReason::signal(Signal::Int))).code(), 1);
        assert_eq!(ExitStatus::TeardownTimedOut.code(), 2);
    }

    #[test]
    fn test_describe_reason() {
        assert_eq!(describe(None), "normal exit");
        assert_eq!(describe(Some(&FailureReason::signal(Signal::Term))), "SIGTERM");
        let fault = FailureReason::from(LifecycleError::Unrecovered { message: "oops".into() });
        assert_eq!(describe(Some(&fault)), "unrecovered fault: oops");
        assert_eq!(FailureReason::signal(Signal::Int).to_string(), "received SIGINT");
    }
}
