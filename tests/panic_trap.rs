//! Panic hook trapping. Kept in its own test binary: the hook is process-wide.

use std::sync::Arc;
use std::time::Duration;

use lifecycle_coordinator::{ExitStatus, FailureReason, LifecycleError};

mod common;

use common::{coordinator, ExitRecorder, RecordingSink};

#[tokio::test]
async fn test_panic_is_an_unrecovered_fault() {
    let sink = Arc::new(RecordingSink::default());
    let exits = ExitRecorder::default();
    let handle = coordinator(&sink, &exits)
        .handle_signals(false)
        .start()
        .unwrap();
    handle.startup_settled().await;

    let worker = tokio::spawn(async {
        panic!("worker blew up");
    });
    assert!(worker.await.unwrap_err().is_panic());

    let status = tokio::time::timeout(Duration::from_secs(5), handle.terminated())
        .await
        .expect("panic was not trapped");
    assert_eq!(status, ExitStatus::Failure);

    match handle.exit_reason() {
        Some(FailureReason::Fault { cause }) => {
            let err = cause.downcast_ref::<LifecycleError>().unwrap();
            assert!(matches!(err, LifecycleError::Unrecovered { message } if message.contains("worker blew up")));
        }
        other => panic!("unexpected reason: {:?}", other),
    }
    assert!(sink
        .lines()
        .iter()
        .any(|l| l.starts_with("trapped unrecovered fault:") && l.contains("worker blew up")));

    // The hook was handed back on disarm: later panics no longer reach the coordinator.
    let _ = tokio::spawn(async { panic!("after teardown") }).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!sink.contains("after teardown"));
}
