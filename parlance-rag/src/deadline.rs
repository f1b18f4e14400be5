//! Timeout and cancellation guard for calls into model backends.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{RagError, Result};

/// Run `call` until it completes, `timeout` elapses, or `cancel` fires.
///
/// Both the deadline and the token surface as [`RagError::Cancelled`]. The
/// future is dropped on either, so nothing it would have produced is observed.
pub(crate) async fn bounded<T>(
    operation: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(RagError::Cancelled {
            operation: operation.to_string(),
            reason: "cancellation requested".to_string(),
        }),
        outcome = tokio::time::timeout(timeout, call) => match outcome {
            Ok(result) => result,
            Err(_) => Err(RagError::Cancelled {
                operation: operation.to_string(),
                reason: format!("timed out after {}s", timeout.as_secs_f64()),
            }),
        },
    }
}
