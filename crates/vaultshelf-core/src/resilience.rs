//! Resilience patterns for remote calls: fixed pacing and rate-limit backoff
//!
//! Every mutating call against the remote service goes through
//! [`paced_retry`]. It sleeps a fixed delay before each attempt and retries
//! only on [`RemoteError::RateLimited`], doubling the backoff each time up to
//! the attempt cap. Any other failure is returned at once.

use crate::error::RemoteError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Pacing and retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Pause before every attempt
    pub request_delay: Duration,
    /// Maximum number of attempts, the first call included
    pub max_attempts: u32,
    /// Backoff after the first rate-limited attempt
    pub initial_backoff: Duration,
    /// Backoff multiplier (exponential)
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// No pacing, no backoff; for tests and offline tooling
    pub fn immediate() -> Self {
        Self {
            request_delay: Duration::ZERO,
            max_attempts: 3,
            initial_backoff: Duration::ZERO,
            backoff_multiplier: 2.0,
        }
    }

    /// Backoff to wait after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(self.initial_backoff.as_secs_f64() * factor)
    }
}

impl Default for RetryPolicy {
    /// 2s, 4s, 8s backoff with three attempts and no pacing
    fn default() -> Self {
        Self {
            request_delay: Duration::ZERO,
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

/// Result of a paced call together with the number of attempts it took
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub result: Result<T, RemoteError>,
    pub attempts: u32,
}

impl<T> Attempted<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run one remote call with fixed pacing and rate-limit backoff.
///
/// `operation` names the call in log output.
pub async fn paced_retry<F, Fut, T>(policy: &RetryPolicy, operation: &str, mut f: F) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        if !policy.request_delay.is_zero() {
            sleep(policy.request_delay).await;
        }

        match f().await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(e) if e.is_rate_limited() && attempt < max_attempts => {
                let backoff = policy.backoff_for(attempt);
                log::warn!(
                    "{} rate limited (attempt {}/{}), retrying in {:?}",
                    operation,
                    attempt,
                    max_attempts,
                    backoff
                );
                sleep(backoff).await;
            }
            Err(e) => {
                if e.is_rate_limited() {
                    log::warn!("{} still rate limited after {} attempts", operation, attempt);
                } else {
                    log::debug!("{} failed without retry: {}", operation, e);
                }
                return Attempted {
                    result: Err(e),
                    attempts: attempt,
                };
            }
        }
    }
}
