//! Shared utilities for coordinator integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use lifecycle_coordinator::{Coordinator, LogSink};

/// Log sink that keeps every line in order.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    #[allow(dead_code)]
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.lines().iter().position(|l| l.contains(needle))
    }
}

impl LogSink for RecordingSink {
    fn info(&self, msg: &str) {
        self.lines.lock().unwrap().push(msg.to_string());
    }

    fn error(&self, msg: &str) {
        self.lines.lock().unwrap().push(msg.to_string());
    }
}

/// Counts terminator invocations instead of exiting the test process.
#[derive(Clone, Default)]
pub struct ExitRecorder {
    calls: Arc<AtomicU32>,
    last_code: Arc<Mutex<Option<i32>>>,
}

impl ExitRecorder {
    #[allow(dead_code)]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn last_code(&self) -> Option<i32> {
        *self.last_code.lock().unwrap()
    }
}

/// A coordinator that records instead of exiting, with traps configured by the caller.
pub fn coordinator(sink: &Arc<RecordingSink>, exits: &ExitRecorder) -> Coordinator {
    let calls = exits.calls.clone();
    let last_code = exits.last_code.clone();
    Coordinator::new()
        .name("test")
        .log_sink(sink.clone())
        .terminator(move |status: lifecycle_coordinator::ExitStatus| {
            calls.fetch_add(1, Ordering::SeqCst);
            *last_code.lock().unwrap() = Some(status.code());
        })
}

/// Same as [`coordinator`] but without any process-wide traps.
#[allow(dead_code)]
pub fn quiet(sink: &Arc<RecordingSink>, exits: &ExitRecorder) -> Coordinator {
    coordinator(sink, exits).handle_signals(false).trap_panics(false)
}

/// Deliver `signal` (e.g. "TERM") to this test process.
#[cfg(unix)]
#[allow(dead_code)]
pub fn send_signal(signal: &str) {
    let status = std::process::Command::new("kill")
        .arg(format!("-{}", signal))
        .arg(std::process::id().to_string())
        .status()
        .expect("failed to run kill");
    assert!(status.success());
}
