//! Retry and deadline wrappers for asynchronous operations.
//!
//! Every network-touching call in the engine goes through these
//! combinators: [`with_retry`] for bounded exponential backoff and
//! [`with_deadline`] for giving up on a slow operation without
//! cancelling it.

use crate::config::{Deadline, RetryPolicy};
use crate::error::{SyncError, SyncResult};
use std::future::Future;
use tracing::debug;

/// Invokes `operation` up to `1 + max_retries` times.
///
/// A failure classified as non-retryable (cancellation, fatal network
/// errors) is re-raised immediately without consuming retry budget.
/// Otherwise the policy observer fires with the 1-indexed failed
/// attempt, the engine waits `min(base * 2^(attempt - 1), max)`, and
/// the operation runs again. When the budget is exhausted, the last
/// error is returned unchanged.
pub async fn with_retry<T, F, Fut>(mut operation: F, policy: &RetryPolicy) -> SyncResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SyncResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if !error.is_retryable() => return Err(error),
            Err(error) if attempt > policy.max_retries => return Err(error),
            Err(error) => {
                debug!("Attempt {} failed, retrying: {}", attempt, error);
                policy.notify_retry(attempt, &error);
                tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
            }
        }
    }
}

/// Races `operation` against the deadline's timer.
///
/// If the timer fires first, the call fails with [`SyncError::Timeout`]
/// carrying the deadline's message. The operation is not cancelled: it
/// keeps running as a detached task, the timer merely stops waiting for
/// it. If the operation finishes first, its result or error is passed
/// through unchanged and the timer is discarded.
pub async fn with_deadline<T, F>(operation: F, deadline: Deadline) -> SyncResult<T>
where
    F: Future<Output = SyncResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let running = tokio::spawn(operation);
    match tokio::time::timeout(deadline.duration, running).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(SyncError::network_fatal(format!(
            "operation aborted: {join_error}"
        ))),
        Err(_elapsed) => Err(SyncError::Timeout {
            message: deadline.timeout_message(),
        }),
    }
}
