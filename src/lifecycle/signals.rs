//! OS signal and fault trapping.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Chain a panic hook that reports panics as unrecovered faults
//! - Route every trap into the lifecycle controller
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered eagerly in `arm`, before startup is scheduled
//! - Repeated signals keep flowing; the controller's exit gate drops them
//! - Listeners hold the controller strongly, so traps stay live when the
//!   embedder drops its handle; `disarm` after teardown releases them
//! - The subscription is owned: `disarm` (or drop) aborts the listeners and
//!   restores the previous panic hook, unless another hook replaced ours

use std::panic::PanicHookInfo;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::LifecycleError;
use crate::lifecycle::controller::{Controller, Trigger};
use crate::lifecycle::state::Signal;

type HookFn = dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static;
type PanicHook = Box<HookFn>;

fn hook_addr(hook: &HookFn) -> usize {
    hook as *const HookFn as *const () as usize
}

/// Owned subscription to termination signals and process panics.
pub(crate) struct SignalDispatcher {
    tasks: Vec<JoinHandle<()>>,
    previous_hook: Option<Arc<PanicHook>>,
    /// Address of the hook we installed, to recognise it on release.
    installed_hook: usize,
}

impl SignalDispatcher {
    /// Register handlers and spawn the listeners that feed `controller`.
    pub(crate) fn arm(
        controller: Arc<Controller>,
        runtime: &Handle,
        handle_signals: bool,
        trap_panics: bool,
    ) -> Result<Self, LifecycleError> {
        let _enter = runtime.enter();
        let mut dispatcher = SignalDispatcher {
            tasks: Vec::new(),
            previous_hook: None,
            installed_hook: 0,
        };

        if handle_signals {
            for signal in Signal::ALL {
                // On error the partially armed dispatcher is dropped and released.
                if let Some(task) = listen(signal, Arc::clone(&controller))? {
                    dispatcher.tasks.push(task);
                }
            }
        }

        if trap_panics {
            let (tx, mut rx) = mpsc::unbounded_channel::<String>();
            let previous: Arc<PanicHook> = Arc::new(std::panic::take_hook());
            let chained = Arc::clone(&previous);
            let hook: PanicHook = Box::new(move |info| {
                chained(info);
                let _ = tx.send(info.to_string());
            });
            dispatcher.installed_hook = hook_addr(hook.as_ref());
            std::panic::set_hook(hook);
            dispatcher.previous_hook = Some(previous);

            let controller = Arc::clone(&controller);
            dispatcher.tasks.push(tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    controller.request(Trigger::Fault(LifecycleError::Unrecovered { message }.into()));
                }
            }));
        }

        tracing::debug!(
            signals = handle_signals,
            panics = trap_panics,
            "Signal dispatcher armed"
        );
        Ok(dispatcher)
    }

    pub(crate) fn is_armed(&self) -> bool {
        !self.tasks.is_empty() || self.previous_hook.is_some()
    }

    /// Deregister every handler this dispatcher installed.
    pub(crate) fn disarm(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.is_armed() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(previous) = self.previous_hook.take() {
            // The hook API panics when touched from a panicking thread.
            if !std::thread::panicking() {
                let current = std::panic::take_hook();
                if hook_addr(current.as_ref()) == self.installed_hook {
                    std::panic::set_hook(Box::new(move |info| previous(info)));
                } else {
                    // Someone chained on top of us after arming; keep their hook.
                    std::panic::set_hook(current);
                    tracing::debug!("Panic hook replaced since arming, leaving it installed");
                }
            }
        }
        tracing::debug!("Signal dispatcher disarmed");
    }
}

impl Drop for SignalDispatcher {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(unix)]
fn listen(signal: Signal, controller: Arc<Controller>) -> Result<Option<JoinHandle<()>>, LifecycleError> {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    let kind = match signal {
        Signal::Term => SignalKind::terminate(),
        Signal::Int => SignalKind::interrupt(),
    };
    let mut stream = unix_signal(kind).map_err(|source| LifecycleError::SignalInstall { signal, source })?;

    Ok(Some(tokio::spawn(async move {
        while stream.recv().await.is_some() {
            tracing::debug!(signal = %signal, "Signal received");
            controller.request(Trigger::Signal(signal));
        }
    })))
}

#[cfg(windows)]
fn listen(signal: Signal, controller: Arc<Controller>) -> Result<Option<JoinHandle<()>>, LifecycleError> {
    use tokio::signal::windows;

    let install_err = |source| LifecycleError::SignalInstall { signal, source };
    let task = match signal {
        Signal::Int => {
            let mut stream = windows::ctrl_c().map_err(install_err)?;
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    controller.request(Trigger::Signal(signal));
                }
            })
        }
        Signal::Term => {
            let mut stream = windows::ctrl_shutdown().map_err(install_err)?;
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    controller.request(Trigger::Signal(signal));
                }
            })
        }
    };
    Ok(Some(task))
}

#[cfg(not(any(unix, windows)))]
fn listen(_signal: Signal, _controller: Arc<Controller>) -> Result<Option<JoinHandle<()>>, LifecycleError> {
    Ok(None)
}
