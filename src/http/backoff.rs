//! Retry policy and backoff calculation
//!
//! Exponential growth from `base_delay`, capped at `delay_cap`, plus a
//! uniformly random jitter of up to `jitter_fraction` of the capped value.

use crate::error::is_retryable_status;
use crate::random::RandomSource;
use std::time::Duration;

/// Immutable retry configuration for one executor
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per request, the first one included
    pub max_retries: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Ceiling for the exponential part of the delay
    pub delay_cap: Duration,
    /// Jitter as a fraction of the capped delay (0.2 = up to +20%)
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1500),
            delay_cap: Duration::from_secs(60),
            jitter_fraction: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy
    pub fn new(max_retries: u32, base_delay: Duration, delay_cap: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            delay_cap,
            ..Self::default()
        }
    }

    /// Set the jitter fraction
    #[must_use]
    pub fn with_jitter(mut self, jitter_fraction: f64) -> Self {
        self.jitter_fraction = jitter_fraction.max(0.0);
        self
    }

    /// Set total attempts
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Number of attempts actually made; never below one
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Whether a response status should be retried under this policy
    pub fn is_retryable(&self, status: u16) -> bool {
        is_retryable_status(status)
    }

    /// Wait before retrying after `attempt` failed (1-based)
    pub fn backoff(&self, attempt: u32, rng: &dyn RandomSource) -> Duration {
        compute_backoff(
            attempt,
            self.base_delay,
            self.delay_cap,
            self.jitter_fraction,
            rng,
        )
    }

    /// Largest value [`RetryPolicy::backoff`] can return
    pub fn max_backoff(&self) -> Duration {
        Duration::try_from_secs_f64(
            self.delay_cap.as_secs_f64() * (1.0 + self.jitter_fraction.max(0.0)),
        )
        .unwrap_or(Duration::MAX)
    }
}

/// `min(cap, base * 2^(attempt-1)) + uniform(0, that * jitter_fraction)`
pub fn compute_backoff(
    attempt: u32,
    base: Duration,
    cap: Duration,
    jitter_fraction: f64,
    rng: &dyn RandomSource,
) -> Duration {
    let exponent = attempt.max(1) - 1;
    let grown = base.as_secs_f64() * 2f64.powi(exponent.min(i32::MAX as u32) as i32);
    let exp = grown.min(cap.as_secs_f64());
    let jitter = rng.uniform(0.0, exp * jitter_fraction.max(0.0));
    let total = exp + jitter;

    if total.is_nan() || total < 0.0 {
        return cap;
    }
    // Saturates when a huge cap pushes the sum past what Duration can hold
    Duration::try_from_secs_f64(total).unwrap_or(Duration::MAX)
}
