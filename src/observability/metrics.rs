//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_triggers_total` (counter): accepted teardown triggers by kind
//! - `lifecycle_triggers_ignored_total` (counter): triggers dropped by the exit gate
//! - `lifecycle_startup_duration_seconds` (histogram): guarded startup wait
//! - `lifecycle_teardown_duration_seconds` (histogram): guarded teardown wait
//! - `lifecycle_exit_status` (gauge): final exit code
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is opt-in and installed by the binary

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::lifecycle::state::ExitStatus;

/// Initialize the Prometheus metrics exporter.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new();
    match builder.with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

pub fn record_trigger(kind: &'static str) {
    counter!("lifecycle_triggers_total", "kind" => kind).increment(1);
}

pub fn record_ignored_trigger(kind: &'static str) {
    counter!("lifecycle_triggers_ignored_total", "kind" => kind).increment(1);
}

pub fn record_startup(elapsed: Duration, ok: bool) {
    let outcome = if ok { "ok" } else { "failed" };
    histogram!("lifecycle_startup_duration_seconds", "outcome" => outcome).record(elapsed.as_secs_f64());
}

pub fn record_teardown(elapsed: Duration, status: ExitStatus) {
    histogram!("lifecycle_teardown_duration_seconds").record(elapsed.as_secs_f64());
    gauge!("lifecycle_exit_status").set(f64::from(status.code()));
}
