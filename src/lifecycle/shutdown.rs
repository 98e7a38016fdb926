//! Shutdown coordination.
//!
//! # Responsibilities
//! - Run the registered teardown action exactly once, under its timeout
//! - Decide the final exit status from the reason and the teardown outcome
//! - Hand the status to the `Terminator`, the real enforcement boundary
//!
//! # Exit Status
//! ```text
//! reason absent, teardown settled in time      → 0
//! reason present, teardown settled in time     → 1 (teardown errors included)
//! teardown did not settle within its bound     → 2
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, FutureExt};

use crate::error::{BoxError, Stage};
use crate::lifecycle::state::{describe, ExitStatus, FailureReason, LifecycleState};
use crate::observability::{metrics, LogSink};
use crate::resilience::guard;

/// Boxed one-shot teardown action; receives the reason (absent for a normal exit).
pub type TeardownAction =
    Box<dyn FnOnce(Option<FailureReason>) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

pub(crate) fn noop_teardown() -> TeardownAction {
    Box::new(|_| async { Ok::<(), BoxError>(()) }.boxed())
}

/// Ends the process once teardown has settled.
pub trait Terminator: Send + Sync + 'static {
    fn terminate(&self, status: ExitStatus);
}

/// Exits the current process with the status code.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, status: ExitStatus) {
        std::process::exit(status.code());
    }
}

impl<F> Terminator for F
where
    F: Fn(ExitStatus) + Send + Sync + 'static,
{
    fn terminate(&self, status: ExitStatus) {
        self(status)
    }
}

pub(crate) struct TeardownSupervisor {
    action: TeardownAction,
    limit: Duration,
    sink: Arc<dyn LogSink>,
}

impl TeardownSupervisor {
    pub(crate) fn new(action: TeardownAction, limit: Duration, sink: Arc<dyn LogSink>) -> Self {
        Self { action, limit, sink }
    }

    /// Run the teardown action. Consumes the supervisor, so it runs at most once.
    pub(crate) async fn run_once(self, state: &LifecycleState, reason: Option<FailureReason>) -> ExitStatus {
        self.sink
            .info(&format!("teardown, reason: {}", describe(reason.as_ref())));
        state.record_reason(reason.clone());

        let action = self.action;
        let arg = reason.clone();
        let started = Instant::now();
        let outcome = guard(Stage::Teardown, self.limit, async move { action(arg).await }).await;

        let status = match outcome {
            Ok(()) => ExitStatus::for_reason(reason.as_ref()),
            Err(err) if err.is_timeout() => {
                self.sink.error(&format!("teardown failed: {}", err));
                ExitStatus::TeardownTimedOut
            }
            Err(err) => {
                self.sink.error(&format!("error during teardown: {}", err));
                ExitStatus::for_reason(reason.as_ref())
            }
        };
        metrics::record_teardown(started.elapsed(), status);

        // One more turn of the scheduler so pending log output can drain.
        tokio::task::yield_now().await;

        if status != ExitStatus::TeardownTimedOut {
            self.sink.info("teardown complete, exiting");
        }
        status
    }
}
