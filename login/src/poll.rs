//! Bounded polling for session authorization.
//!
//! One `get_session` per tick, a fixed interval between ticks, and a
//! wall-clock deadline from loop entry. Both the request and the sleep race
//! the cancellation token and the deadline, so neither can hold the loop
//! past its bound.

use std::time::Duration;

use lab_api_client::Session;
use lab_api_client::SessionService;
use lab_async_utils::CancelErr;
use lab_async_utils::OrCancelExt;
use lab_async_utils::sleep_or_cancel;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Authorized(Session),
    TimedOut,
    Cancelled,
}

impl From<CancelErr> for PollOutcome {
    fn from(err: CancelErr) -> Self {
        match err {
            CancelErr::Cancelled => Self::Cancelled,
            CancelErr::DeadlineElapsed => Self::TimedOut,
        }
    }
}

/// Poll `session_id` until it is authorized, the deadline passes, or `cancel` fires.
///
/// Errors from the service count as "not yet". `on_pending` is called with
/// the attempt number after every poll that did not authorize.
pub async fn wait_for_authorization<F>(
    service: &dyn SessionService,
    session_id: &str,
    settings: PollSettings,
    cancel: &CancellationToken,
    mut on_pending: F,
) -> PollOutcome
where
    F: FnMut(u32) + Send,
{
    let deadline = Instant::now() + settings.timeout;
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }
        attempt = attempt.saturating_add(1);

        match service
            .get_session(session_id)
            .or_cancel_until(cancel, deadline)
            .await
        {
            Ok(Ok(session)) if session.authenticated => {
                tracing::debug!(attempt, "session authorized");
                return PollOutcome::Authorized(session);
            }
            Ok(Ok(_)) => {
                tracing::trace!(attempt, "session not authorized yet");
            }
            Ok(Err(err)) => {
                tracing::debug!(
                    attempt,
                    transient = err.is_transient(),
                    "polling session failed: {err}"
                );
            }
            Err(interrupted) => return interrupted.into(),
        }

        on_pending(attempt);

        if let Err(interrupted) = sleep_or_cancel(settings.interval, cancel, deadline).await {
            return interrupted.into();
        }
    }
}
