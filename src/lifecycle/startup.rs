//! Startup orchestration.
//!
//! # Responsibilities
//! - Run the registered startup action exactly once, under its timeout
//! - Publish the moment startup settles (success, failure or timeout)
//! - Report completion or failure to the operator log
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and escalates to teardown
//! - The first poll yields once, so handler wiring finishes before startup code runs
//! - A timed-out startup counts as settled even though the action keeps running

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::watch;

use crate::error::{BoxError, LifecycleError, Stage};
use crate::observability::{metrics, LogSink};
use crate::resilience::guard;

/// Boxed one-shot startup action.
pub type StartupAction = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

pub(crate) fn noop_startup() -> StartupAction {
    Box::new(|| async { Ok::<(), BoxError>(()) }.boxed())
}

pub(crate) struct StartupSupervisor {
    action: StartupAction,
    limit: Duration,
    sink: Arc<dyn LogSink>,
    settled: watch::Sender<bool>,
}

impl StartupSupervisor {
    pub(crate) fn new(
        action: StartupAction,
        limit: Duration,
        sink: Arc<dyn LogSink>,
        settled: watch::Sender<bool>,
    ) -> Self {
        Self {
            action,
            limit,
            sink,
            settled,
        }
    }

    /// Run the startup action once and report its outcome.
    pub(crate) async fn run(self) -> Result<(), LifecycleError> {
        tokio::task::yield_now().await;

        let action = self.action;
        let started = Instant::now();
        let outcome = guard(Stage::Startup, self.limit, async move { action().await }).await;
        metrics::record_startup(started.elapsed(), outcome.is_ok());

        self.settled.send_replace(true);

        match &outcome {
            Ok(()) => self.sink.info("startup complete"),
            Err(err) => self.sink.error(&format!("startup failed: {}", err)),
        }
        outcome
    }
}
