//! Engine types
//!
//! Configuration, statistics and outcome of a fetch.

use crate::http::RetryPolicy;
use crate::types::{Record, TerminationReason};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one logical fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Requested page size, clamped to what the target accepts
    pub page_size: usize,
    /// Stop once this many records are accumulated (`None` = unlimited)
    pub max_results: Option<usize>,
    /// Lower bound of the pause between pages
    pub min_delay: Duration,
    /// Upper bound of the pause between pages
    pub max_delay: Duration,
    /// Where progress is persisted (`None` = no checkpoints)
    pub checkpoint_path: Option<PathBuf>,
    /// Write a checkpoint after every Nth page
    pub checkpoint_every: u32,
    /// Continue from an existing checkpoint
    pub resume: bool,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Retry behaviour for every page request
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_results: None,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(2),
            checkpoint_path: None,
            checkpoint_every: 1,
            resume: true,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchConfig {
    /// Create a new fetch config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Cap the number of accumulated records
    #[must_use]
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Set the inter-page delay range
    #[must_use]
    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max;
        self
    }

    /// No pause between pages
    #[must_use]
    pub fn without_delay(self) -> Self {
        self.with_delay(Duration::ZERO, Duration::ZERO)
    }

    /// Persist progress to `path`
    #[must_use]
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    /// Checkpoint after every `pages` pages
    #[must_use]
    pub fn with_checkpoint_every(mut self, pages: u32) -> Self {
        self.checkpoint_every = pages;
        self
    }

    /// Enable or disable resuming
    #[must_use]
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Set request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Checkpoint cadence, never zero
    pub fn checkpoint_interval(&self) -> u32 {
        self.checkpoint_every.max(1)
    }

    /// Delay bounds in seconds, with `max` raised to `min` if inverted
    pub(crate) fn delay_bounds(&self) -> (f64, f64) {
        let min = self.min_delay.as_secs_f64();
        (min, self.max_delay.as_secs_f64().max(min))
    }
}

/// Statistics from a fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    /// Pages processed in this run
    pub pages: u32,
    /// HTTP requests issued, retries included
    pub requests: u64,
    /// Records admitted in this run
    pub accepted: usize,
    /// Records dropped as duplicates
    pub duplicates_skipped: usize,
    /// Checkpoint files written
    pub checkpoints_written: u32,
    /// Duration in milliseconds
    pub elapsed_ms: u64,
}

impl FetchStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed page
    pub fn add_page(&mut self, accepted: usize, duplicates: usize) {
        self.pages += 1;
        self.accepted += accepted;
        self.duplicates_skipped += duplicates;
    }

    pub fn add_checkpoint(&mut self) {
        self.checkpoints_written += 1;
    }
}

/// Result of a fetch that terminated normally
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    /// Accumulated, deduplicated records in first-seen order
    pub records: Vec<Record>,
    /// Why the walk stopped
    pub reason: TerminationReason,
    /// Run statistics
    pub stats: FetchStats,
    /// Last total the provider reported, if any
    pub total_count: Option<u64>,
}

impl FetchOutcome {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
