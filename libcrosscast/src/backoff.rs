//! Polling and retry primitives shared by the coordinators.
//!
//! Every polling loop in the pipeline (chunked-upload processing waits,
//! container readiness, the transient carousel retry) runs through the
//! same two functions so the backoff and deadline semantics stay
//! consistent and testable in one place.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::PublishError;

/// Exponential backoff schedule: `initial`, doubling per attempt,
/// capped at `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub cap: Duration,
}

impl BackoffPolicy {
    pub const fn new(initial: Duration, cap: Duration) -> Self {
        Self { initial, cap }
    }

    /// Delay before the given zero-based retry attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.initial.saturating_mul(factor).min(self.cap)
    }
}

/// What a poll observed: done, try again per the policy, or try again
/// after a server-suggested delay.
#[derive(Debug)]
pub enum PollOutcome<T> {
    Ready(T),
    Retry,
    RetryAfter(Duration),
}

/// Poll `op` until it is ready, sleeping between attempts, with a hard
/// wall-clock `budget`.
///
/// A server-suggested delay (`RetryAfter`) overrides the schedule but is
/// never shorter than the policy's initial delay. Errors from `op` abort
/// immediately; exceeding the budget yields [`PublishError::Timeout`]
/// naming `what`.
pub async fn poll_until<T, F, Fut>(
    policy: BackoffPolicy,
    budget: Duration,
    what: &str,
    mut op: F,
) -> Result<T, PublishError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, PublishError>>,
{
    let deadline = Instant::now() + budget;
    let mut attempt: u32 = 0;

    loop {
        let delay = match op().await? {
            PollOutcome::Ready(value) => return Ok(value),
            PollOutcome::Retry => {
                let delay = policy.delay(attempt);
                attempt += 1;
                delay
            }
            PollOutcome::RetryAfter(suggested) => suggested.max(policy.initial),
        };

        if Instant::now() + delay > deadline {
            warn!(what, "polling budget exhausted");
            return Err(PublishError::Timeout(what.to_string()));
        }
        debug!(what, delay_secs = delay.as_secs(), "not ready, waiting");
        sleep(delay).await;
    }
}

/// Run `op`, retrying only errors the platform flagged as transient,
/// up to `max_attempts` total attempts with the policy's schedule.
///
/// Non-transient errors fail immediately; the last transient error is
/// returned once attempts are exhausted.
pub async fn retry_transient<T, F, Fut>(
    policy: BackoffPolicy,
    max_attempts: u32,
    what: &str,
    mut op: F,
) -> Result<T, PublishError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PublishError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(what, attempt = attempt + 1, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if error.is_transient() && attempt + 1 < max_attempts => {
                let delay = policy.delay(attempt);
                attempt += 1;
                warn!(
                    what,
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs(),
                    %error,
                    "transient error, retrying"
                );
                sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
