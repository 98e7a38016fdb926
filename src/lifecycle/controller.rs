//! Lifecycle controller.
//!
//! Ties the startup supervisor, the signal dispatcher and the teardown
//! supervisor together. Every teardown trigger (startup failure, signal,
//! unrecovered fault, explicit request) funnels through [`Controller::request`],
//! where a single compare-exchange on `exiting` decides whether it wins.
//!
//! ```text
//! trigger ──▶ exit gate ──lost──▶ ignored
//!                │won
//!                ▼
//!        record reason, log trap
//!                │
//!                ▼
//!   traps wait for startup to settle (≤ teardown timeout)
//!                │
//!                ▼
//!   teardown supervisor ──▶ disarm dispatcher ──▶ Terminated ──▶ Terminator
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::config::LifecycleConfig;
use crate::error::{BoxError, LifecycleError};
use crate::lifecycle::shutdown::{noop_teardown, ProcessExit, TeardownAction, TeardownSupervisor, Terminator};
use crate::lifecycle::signals::SignalDispatcher;
use crate::lifecycle::startup::{noop_startup, StartupAction, StartupSupervisor};
use crate::lifecycle::state::{ExitStatus, FailureReason, LifecycleState, Phase, Signal};
use crate::observability::{metrics, LogSink, TracingSink};

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A request to begin teardown.
#[derive(Debug, Clone)]
pub(crate) enum Trigger {
    StartupFailure(FailureReason),
    Signal(Signal),
    Fault(FailureReason),
    Explicit(Option<FailureReason>),
}

impl Trigger {
    fn kind(&self) -> &'static str {
        match self {
            Trigger::StartupFailure(_) => "startup_failure",
            Trigger::Signal(_) => "signal",
            Trigger::Fault(_) => "fault",
            Trigger::Explicit(_) => "explicit",
        }
    }

    fn into_reason(self) -> Option<FailureReason> {
        match self {
            Trigger::StartupFailure(reason) | Trigger::Fault(reason) => Some(reason),
            Trigger::Signal(signal) => Some(FailureReason::signal(signal)),
            Trigger::Explicit(reason) => reason,
        }
    }
}

pub(crate) struct Controller {
    state: LifecycleState,
    sink: Arc<dyn LogSink>,
    teardown_timeout: Duration,
    startup_settled: watch::Receiver<bool>,
    teardown: Mutex<Option<TeardownSupervisor>>,
    dispatcher: Mutex<Option<SignalDispatcher>>,
    terminator: Arc<dyn Terminator>,
    runtime: Handle,
}

impl Controller {
    /// Offer a trigger to the exit gate. Returns `true` if it won.
    ///
    /// Never blocks: waiting for startup and running teardown happen on a
    /// spawned task.
    pub(crate) fn request(self: &Arc<Self>, trigger: Trigger) -> bool {
        let kind = trigger.kind();
        if !self.state.try_begin_exit() {
            tracing::debug!(kind, "Teardown already underway, ignoring trigger");
            metrics::record_ignored_trigger(kind);
            return false;
        }
        metrics::record_trigger(kind);

        // Only traps wait for startup. A failed startup has already settled,
        // and an explicit request is honoured right away.
        let wait_for_startup = matches!(trigger, Trigger::Signal(_) | Trigger::Fault(_));
        match &trigger {
            Trigger::Signal(signal) => {
                self.sink
                    .info(&format!("trapped {}, assuring startup complete...", signal));
            }
            Trigger::Fault(reason) => {
                self.sink.error(&format!(
                    "trapped unrecovered fault: {}, assuring startup complete...",
                    reason
                ));
            }
            Trigger::StartupFailure(_) | Trigger::Explicit(_) => {}
        }

        let reason = trigger.into_reason();
        self.state.record_reason(reason.clone());

        let controller = Arc::clone(self);
        self.runtime.spawn(async move {
            if wait_for_startup {
                controller.await_startup().await;
            }
            controller.finish(reason).await;
        });
        true
    }

    async fn await_startup(&self) {
        let mut settled = self.startup_settled.clone();
        let waited = tokio::time::timeout(self.teardown_timeout, settled.wait_for(|done| *done)).await;
        // A closed channel means the startup task is gone; nothing left to wait on.
        if waited.is_err() {
            self.sink.error(&format!(
                "startup couldn't complete in {} sec",
                self.teardown_timeout.as_secs_f64()
            ));
        }
    }

    async fn finish(&self, reason: Option<FailureReason>) {
        let supervisor = lock(&self.teardown).take();
        let Some(supervisor) = supervisor else {
            return;
        };
        let status = supervisor.run_once(&self.state, reason).await;

        let dispatcher = lock(&self.dispatcher).take();
        if let Some(dispatcher) = dispatcher {
            dispatcher.disarm();
        }

        self.state.mark_terminated(status);
        tracing::debug!(code = status.code(), "Terminating");
        self.terminator.terminate(status);
    }
}

/// Builder for a process lifecycle coordinator.
///
/// ```no_run
/// # async fn example() -> Result<(), lifecycle_coordinator::LifecycleError> {
/// use lifecycle_coordinator::{BoxError, Coordinator};
///
/// let handle = Coordinator::new()
///     .name("worker")
///     .startup(|| async { Ok::<(), BoxError>(()) })
///     .teardown(|reason| async move {
///         println!("stopping: {:?}", reason);
///         Ok::<(), BoxError>(())
///     })
///     .start()?;
/// handle.terminated().await;
/// # Ok(())
/// # }
/// ```
pub struct Coordinator {
    name: String,
    startup: Option<StartupAction>,
    teardown: Option<TeardownAction>,
    startup_timeout: Duration,
    teardown_timeout: Duration,
    sink: Option<Arc<dyn LogSink>>,
    terminator: Arc<dyn Terminator>,
    handle_signals: bool,
    trap_panics: bool,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            name: "process".to_string(),
            startup: None,
            teardown: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
            sink: None,
            terminator: Arc::new(ProcessExit),
            handle_signals: true,
            trap_panics: true,
        }
    }

    /// Seed the builder from a validated configuration section.
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self::new()
            .name(config.name.clone())
            .startup_timeout(config.startup_timeout())
            .teardown_timeout(config.teardown_timeout())
            .handle_signals(config.handle_signals)
            .trap_panics(config.trap_panics)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The action run once at boot.
    pub fn startup<F, Fut>(mut self, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.startup = Some(Box::new(move || action().boxed()));
        self
    }

    /// The action run once at shutdown with the triggering reason.
    pub fn teardown<F, Fut>(mut self, action: F) -> Self
    where
        F: FnOnce(Option<FailureReason>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.teardown = Some(Box::new(move |reason| action(reason).boxed()));
        self
    }

    pub fn startup_timeout(mut self, limit: Duration) -> Self {
        self.startup_timeout = limit;
        self
    }

    /// Also bounds the wait for startup to settle on signal-triggered shutdown.
    pub fn teardown_timeout(mut self, limit: Duration) -> Self {
        self.teardown_timeout = limit;
        self
    }

    /// Replace the default name-scoped tracing sink.
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the default `ProcessExit` terminator.
    pub fn terminator<T: Terminator>(mut self, terminator: T) -> Self {
        self.terminator = Arc::new(terminator);
        self
    }

    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Chain a panic hook that turns panics into unrecovered faults.
    ///
    /// The hook present at `start()` is put back after teardown. A hook set
    /// on top of ours in the meantime is left installed.
    pub fn trap_panics(mut self, enabled: bool) -> Self {
        self.trap_panics = enabled;
        self
    }

    /// Arm the traps, then schedule startup. Must be called inside a Tokio runtime.
    pub fn start(self) -> Result<LifecycleHandle, LifecycleError> {
        let runtime = Handle::try_current()?;
        let name = self.name;
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink::new(name.clone())));

        let (settled_tx, settled_rx) = watch::channel(false);
        let startup = StartupSupervisor::new(
            self.startup.unwrap_or_else(noop_startup),
            self.startup_timeout,
            Arc::clone(&sink),
            settled_tx,
        );
        let teardown = TeardownSupervisor::new(
            self.teardown.unwrap_or_else(noop_teardown),
            self.teardown_timeout,
            Arc::clone(&sink),
        );

        let controller = Arc::new(Controller {
            state: LifecycleState::new(),
            sink,
            teardown_timeout: self.teardown_timeout,
            startup_settled: settled_rx,
            teardown: Mutex::new(Some(teardown)),
            dispatcher: Mutex::new(None),
            terminator: self.terminator,
            runtime: runtime.clone(),
        });

        // Handlers are registered before the startup task exists. The slot
        // stays locked until the dispatcher is stored, so a teardown racing
        // with arming still finds it to disarm.
        if self.handle_signals || self.trap_panics {
            let mut slot = lock(&controller.dispatcher);
            *slot = Some(SignalDispatcher::arm(
                Arc::clone(&controller),
                &runtime,
                self.handle_signals,
                self.trap_panics,
            )?);
        }

        tracing::debug!(
            name = %name,
            startup_timeout_secs = self.startup_timeout.as_secs_f64(),
            teardown_timeout_secs = self.teardown_timeout.as_secs_f64(),
            "Lifecycle coordinator armed"
        );

        let task_controller = Arc::clone(&controller);
        runtime.spawn(async move {
            match startup.run().await {
                Ok(()) => {
                    task_controller.state.mark_running();
                }
                Err(err) => {
                    task_controller.request(Trigger::StartupFailure(err.into()));
                }
            }
        });

        Ok(LifecycleHandle { controller })
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Read access to the lifecycle state plus the teardown entry points.
#[derive(Clone)]
pub struct LifecycleHandle {
    controller: Arc<Controller>,
}

impl LifecycleHandle {
    pub fn state(&self) -> &LifecycleState {
        &self.controller.state
    }

    pub fn phase(&self) -> Phase {
        self.controller.state.phase()
    }

    pub fn is_exiting(&self) -> bool {
        self.controller.state.is_exiting()
    }

    pub fn exit_reason(&self) -> Option<FailureReason> {
        self.controller.state.exit_reason()
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.controller.state.exit_status()
    }

    /// Force teardown. `None` requests a normal exit.
    ///
    /// Unlike a trapped signal, this does not wait for startup to settle.
    pub fn teardown(&self, reason: Option<FailureReason>) -> bool {
        self.controller.request(Trigger::Explicit(reason))
    }

    /// Route a termination signal observed by some other source.
    pub fn trap_signal(&self, signal: Signal) -> bool {
        self.controller.request(Trigger::Signal(signal))
    }

    /// Route an unrecovered fault detected outside the coordinator.
    pub fn report_fault<E>(&self, err: E) -> bool
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.controller.request(Trigger::Fault(FailureReason::fault(err)))
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.controller.state.subscribe()
    }

    /// Resolves once startup succeeded, failed or timed out.
    pub async fn startup_settled(&self) {
        let mut settled = self.controller.startup_settled.clone();
        let _ = settled.wait_for(|done| *done).await;
    }

    /// Resolves once teardown finished and the exit status is decided.
    pub async fn terminated(&self) -> ExitStatus {
        let mut phase = self.subscribe();
        let _ = phase.wait_for(|p| *p == Phase::Terminated).await;
        self.exit_status().unwrap_or(ExitStatus::Failure)
    }
}

impl fmt::Debug for LifecycleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHandle")
            .field("phase", &self.phase())
            .field("exit_reason", &self.exit_reason())
            .finish()
    }
}
