//! Bounded, panic-isolated invocation of plugin-provided code.
//!
//! Every call into a command handler, event handler, or plugin lifecycle
//! entry point goes through [`guarded`], so one misbehaving plugin can
//! neither unwind through the host nor stall it indefinitely.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use resonance_core::error::AppError;
use resonance_core::result::AppResult;

/// Why a guarded call did not produce a value.
#[derive(Debug)]
pub(crate) enum HandlerFailure {
    /// The handler returned an error.
    Error(AppError),
    /// The handler panicked.
    Panicked(String),
    /// The handler did not finish within the allotted time.
    TimedOut(Duration),
}

impl HandlerFailure {
    /// Converts the failure into an [`AppError`], keeping a returned error as-is.
    pub(crate) fn into_error(self) -> AppError {
        match self {
            Self::Error(e) => e,
            Self::Panicked(msg) => AppError::internal(format!("Handler panicked: {msg}")),
            Self::TimedOut(after) => {
                AppError::internal(format!("Handler timed out after {after:?}"))
            }
        }
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(e) => write!(f, "{e}"),
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
            Self::TimedOut(after) => write!(f, "timed out after {after:?}"),
        }
    }
}

/// Runs `fut` with a timeout, converting panics and errors into [`HandlerFailure`].
pub(crate) async fn guarded<T, F>(timeout: Duration, fut: F) -> Result<T, HandlerFailure>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(timeout, AssertUnwindSafe(fut).catch_unwind()).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(HandlerFailure::Error(e)),
        Ok(Err(payload)) => Err(HandlerFailure::Panicked(panic_message(payload.as_ref()))),
        Err(_) => Err(HandlerFailure::TimedOut(timeout)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
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

    use resonance_core::ErrorKind;

    #[tokio::test]
    async fn test_ok_passes_through() {
        let result = guarded(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.ok(), Some(7));
    }

    #[tokio::test]
    async fn test_error_is_preserved() {
        let result: Result<(), _> = guarded(Duration::from_secs(1), async {
            Err(AppError::validation("bad input"))
        })
        .await;

        let err = result.unwrap_err().into_error();
        assert!(err.is(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let result: Result<(), _> = guarded(Duration::from_secs(1), async {
            if true {
                panic!("boom");
            }
            Ok(())
        })
        .await;

        match result {
            Err(HandlerFailure::Panicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected panic failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let result: Result<(), _> = guarded(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(HandlerFailure::TimedOut(_))));
    }
}
