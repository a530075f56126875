//! HTTP client module
//!
//! Provides the retrying request executor and its backoff policy.
//!
//! # Features
//!
//! - **Automatic Retries**: transient statuses (401, 403, 429, 503, 504) and
//!   transport failures are retried up to the policy's attempt budget
//! - **Backoff**: exponential with a ceiling and random jitter
//! - **Rate Limiting**: optional token bucket ceiling using governor
//! - **Cancellation**: every attempt and every wait observes a cancellation token

mod backoff;
mod client;
mod rate_limit;

pub use backoff::{compute_backoff, RetryPolicy};
pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestSpec, DEFAULT_API_KEY_HEADER,
};
pub(crate) use client::sleep_cancellable;
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
