//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound how long the coordinator waits on a startup or teardown action
//! - Surface panics inside the action as errors instead of unwinding the caller
//!
//! # Design Decisions
//! - The action runs as its own Tokio task; a timeout stops the wait, not the task
//! - Timeout errors are distinct from action errors (`LifecycleError::Timeout`)
//! - The process exit is the real enforcement boundary for a hung action

use std::any::Any;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinError;

use crate::error::{BoxError, LifecycleError, Stage};

/// Run `action` to completion or until `limit` elapses, whichever comes first.
///
/// When the limit fires the action keeps running in the background; only its
/// result is abandoned. Must be called from within a Tokio runtime.
pub async fn guard<F, T>(stage: Stage, limit: Duration, action: F) -> Result<T, LifecycleError>
where
    F: Future<Output = Result<T, BoxError>> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::spawn(action);

    match tokio::time::timeout(limit, task).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(source))) => Err(LifecycleError::Action { stage, source }),
        Ok(Err(join_err)) => Err(from_join_error(stage, join_err)),
        Err(_) => {
            tracing::debug!(stage = %stage, limit_secs = limit.as_secs_f64(), "Guard elapsed, abandoning wait");
            Err(LifecycleError::Timeout { stage, limit })
        }
    }
}

fn from_join_error(stage: Stage, err: JoinError) -> LifecycleError {
    if err.is_panic() {
        LifecycleError::Panicked {
            stage,
            message: panic_message(err.into_panic().as_ref()),
        }
    } else {
        LifecycleError::Cancelled { stage }
    }
}

/// Best-effort extraction of a panic payload's message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_guard_returns_value_within_limit() {
        let res = guard(Stage::Startup, Duration::from_secs(1), async { Ok::<_, BoxError>(7) }).await;
        assert_eq!(res.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_guard_wraps_action_error() {
        let res: Result<(), _> = guard(Stage::Teardown, Duration::from_secs(1), async {
            Err::<(), BoxError>("boom".into())
        })
        .await;
        match res {
            Err(LifecycleError::Action { stage, source }) => {
                assert_eq!(stage, Stage::Teardown);
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_times_out_without_cancelling() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let res: Result<(), _> = guard(Stage::Startup, Duration::from_secs(1), async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            flag.store(true, Ordering::SeqCst);
            Ok::<(), BoxError>(())
        })
        .await;

        match res {
            Err(LifecycleError::Timeout { stage, limit }) => {
                assert_eq!(stage, Stage::Startup);
                assert_eq!(limit, Duration::from_secs(1));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!finished.load(Ordering::SeqCst));

        // The abandoned action still runs to completion.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_guard_reports_panics() {
        let res: Result<(), _> = guard(Stage::Startup, Duration::from_secs(1), async {
            if true {
                panic!("startup exploded");
            }
            Ok::<(), BoxError>(())
        })
        .await;
        match res {
            Err(LifecycleError::Panicked { message, .. }) => assert_eq!(message, "startup exploded"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
