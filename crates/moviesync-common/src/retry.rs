//! Retry policy for transient infrastructure failures
//!
//! An explicit, value-typed policy instead of an ad-hoc loop around each
//! network call: the caller decides which errors are retryable, the policy
//! decides how often and how long to wait. Delays grow exponentially from
//! `initial_delay` by `multiplier` and are capped at `max_delay`.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default total number of attempts (initial call + retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;

/// Default growth factor between consecutive delays.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Default upper bound on a single delay.
pub const DEFAULT_MAX_DELAY_SECS: u64 = 10;

/// Bounded exponential backoff policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts before giving up (must be at least 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Growth factor applied to the delay after each failed attempt
    pub multiplier: f64,
    /// Cap on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    /// The delay scheduled after the failed attempt with the given zero-based
    /// index: `initial_delay * multiplier^attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(raw.min(self.max_delay.as_secs_f64()))
    }

    /// The full delay schedule, one entry per retry this policy allows.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts.saturating_sub(1)).map(|attempt| self.delay_for(attempt))
    }

    /// Run `operation` until it succeeds, fails with an error `retryable`
    /// rejects, or the allowed attempts are exhausted. The terminal error is
    /// returned to the caller; intermediate failures are logged.
    pub async fn run<T, E, F, Fut, R>(
        &self,
        operation: &str,
        retryable: R,
        mut f: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if retryable(&err) && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => return Err(err),
            }
        }
    }
}
