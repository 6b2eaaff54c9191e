//! Async utilities for cancellation-aware futures.
//!
//! Provides the `OrCancelExt` trait for racing futures against a
//! `CancellationToken` and, optionally, a wall-clock deadline.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a raced future did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelErr {
    /// The token was cancelled first.
    Cancelled,
    /// The deadline elapsed first.
    DeadlineElapsed,
}

/// Extension trait for making futures cancellable.
#[async_trait]
pub trait OrCancelExt: Sized {
    type Output;

    /// Race this future against the cancellation token.
    ///
    /// Returns `Ok(output)` if the future completes first, or
    /// `Err(CancelErr::Cancelled)` if the token is cancelled. An
    /// already-cancelled token wins even against a ready future.
    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, CancelErr>;

    /// Race this future against the token and a deadline.
    ///
    /// Cancellation wins over an elapsed deadline when both are ready.
    async fn or_cancel_until(
        self,
        token: &CancellationToken,
        deadline: Instant,
    ) -> Result<Self::Output, CancelErr>;
}

#[async_trait]
impl<F> OrCancelExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, CancelErr> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(CancelErr::Cancelled),
            res = self => Ok(res),
        }
    }

    async fn or_cancel_until(
        self,
        token: &CancellationToken,
        deadline: Instant,
    ) -> Result<Self::Output, CancelErr> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(CancelErr::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Err(CancelErr::DeadlineElapsed),
            res = self => Ok(res),
        }
    }
}

/// Sleep for `duration` unless the token is cancelled or `deadline` passes first.
///
/// A zero duration still observes an already-cancelled token.
pub async fn sleep_or_cancel(
    duration: Duration,
    token: &CancellationToken,
    deadline: Instant,
) -> Result<(), CancelErr> {
    if token.is_cancelled() {
        return Err(CancelErr::Cancelled);
    }
    tokio::time::sleep(duration)
        .or_cancel_until(token, deadline)
        .await
}
