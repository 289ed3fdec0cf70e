//! Bounded retry with fixed backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::error::{FetchFailure, Result};

/// Default number of attempts per provider.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// How many times to attempt an operation and how long to wait in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed delay between consecutive attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// A policy that attempts exactly once.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Runs `operation` under `policy`.
///
/// See [`with_retry_until`].
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry_until(policy, None, operation).await
}

/// Runs `operation` up to `policy.max_attempts` times.
///
/// The operation receives the 1-based attempt number. Only transient
/// failures (see [`FetchFailure::is_transient`]) are retried; any other
/// failure is returned immediately. The backoff is slept between attempts,
/// never after the last one. When all attempts fail the last failure is
/// returned.
///
/// If `deadline` is set, no attempt starts after it and a backoff that would
/// cross it is not slept; [`FetchFailure::DeadlineExceeded`] is returned
/// instead, carrying the last attempt's failure when one ran.
pub async fn with_retry_until<T, F, Fut>(
    policy: &RetryPolicy,
    deadline: Option<Instant>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    let mut last_error = None;

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(FetchFailure::deadline_exceeded(last_error));
        }

        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_transient() {
            debug!(attempt, error = %err, "Not retrying deterministic failure");
            return Err(err);
        }
        if attempt >= max_attempts {
            warn!(attempts = attempt, error = %err, "Retry budget exhausted");
            return Err(err);
        }
        if deadline.is_some_and(|d| d.saturating_duration_since(Instant::now()) < policy.backoff) {
            warn!(attempt, error = %err, "Deadline leaves no room for another attempt");
            return Err(FetchFailure::deadline_exceeded(Some(err)));
        }

        warn!(
            attempt,
            max_attempts,
            backoff = ?policy.backoff,
            error = %err,
            "Transient failure, retrying"
        );
        last_error = Some(err);
        sleep(policy.backoff).await;
        attempt += 1;
    }
}
