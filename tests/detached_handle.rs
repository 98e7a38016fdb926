//! Traps outlive the handle returned by `start()`. Own test binary: it sends
//! a real SIGTERM to the process.
#![cfg(unix)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lifecycle_coordinator::{BoxError, FailureReason};
use tokio::time::sleep;

mod common;

use common::{coordinator, send_signal, ExitRecorder, RecordingSink};

#[tokio::test]
async fn test_dropped_handle_still_traps_sigterm() {
    let sink = Arc::new(RecordingSink::default());
    let exits = ExitRecorder::default();
    let teardowns = Arc::new(AtomicU32::new(0));
    let count = teardowns.clone();

    let handle = coordinator(&sink, &exits)
        .trap_panics(false)
        .teardown(move |_reason: Option<FailureReason>| {
            count.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), BoxError>(()) }
        })
        .start()
        .unwrap();
    drop(handle);

    // Once startup is done only the armed listeners reference the coordinator.
    tokio::time::timeout(Duration::from_secs(5), async {
        while !sink.contains("startup complete") {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("startup did not complete");
    sleep(Duration::from_millis(50)).await;

    send_signal("TERM");
    tokio::time::timeout(Duration::from_secs(5), async {
        while exits.calls() == 0 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("SIGTERM was not handled after the handle was dropped");

    assert_eq!(exits.calls(), 1);
    assert_eq!(exits.last_code(), Some(1));
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    assert!(sink.contains("trapped SIGTERM, assuring startup complete..."));
    assert!(sink.contains("teardown, reason: SIGTERM"));
}
