//! Fetch engine module
//!
//! The pagination walker: drives the retrying client across cursor pages,
//! deduplicates, checkpoints and decides when to stop.
//!
//! # Overview
//!
//! The engine module provides:
//! - `FetchEngine` - Runs one logical fetch against a `PageTarget`
//! - `FetchConfig` - Page size, result cap, delays, checkpointing, retries
//! - `FetchSession` - The state folded through each page
//! - `FetchOutcome` / `FetchStats` - What a completed fetch returns
//!
//! # Termination
//!
//! After each page the walk stops on the first of: no next cursor, a cursor
//! already requested this session, or the result cap. The cap is also
//! checked before every request. Fatal request errors are returned as `Err`
//! and leave the last periodic checkpoint untouched.

mod session;
mod types;

pub use session::{FetchSession, PageDelta};
pub use types::{FetchConfig, FetchOutcome, FetchStats};

use crate::error::{Error, Result};
use crate::http::{sleep_cancellable, HttpClient};
use crate::pagination::{CursorStep, PageResult};
use crate::random::{RandomSource, ThreadRandom};
use crate::state::CheckpointStore;
use crate::targets::PageTarget;
use crate::types::TerminationReason;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Pagination walker for one logical fetch at a time
pub struct FetchEngine {
    /// HTTP client
    client: HttpClient,
    /// Fetch configuration
    config: FetchConfig,
    /// Source of inter-page delays
    rng: Arc<dyn RandomSource>,
    /// Stop signal checked before requests and during sleeps
    cancel: CancellationToken,
}

impl FetchEngine {
    /// Create a new fetch engine
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            config: FetchConfig::default(),
            rng: Arc::new(ThreadRandom),
            cancel: CancellationToken::new(),
        }
    }

    /// Set fetch configuration
    #[must_use]
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the random source used for inter-page delays
    #[must_use]
    pub fn with_random(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Abort the fetch when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Get the HTTP client
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Token that stops this engine
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Checkpoint store for the configured path
    pub fn checkpoint_store(&self) -> CheckpointStore {
        CheckpointStore::from_option(self.config.checkpoint_path.clone())
    }

    /// Run one logical fetch to termination
    pub async fn run(&self, target: &dyn PageTarget) -> Result<FetchOutcome> {
        let start = Instant::now();
        let store = self.checkpoint_store();
        let requests_before = self.client.requests_sent();
        let page_size = target.clamp_page_size(self.config.page_size);
        let interval = self.config.checkpoint_interval();

        let mut session = self.start_session(&store).await;
        let mut stats = FetchStats::new();
        let mut total_count = None;

        info!(
            endpoint = target.name(),
            page_size,
            resumed_pages = session.page_count,
            resumed_records = session.results.len(),
            "Starting fetch"
        );

        let reason = loop {
            if session.is_full(self.config.max_results) {
                break TerminationReason::MaxResults;
            }
            if self.cancel.is_cancelled() {
                return Err(self.save_cancelled(&store, &session, &mut stats).await);
            }

            let cursor = session.begin_page();

            let (status, body) = match self.fetch_page(target, cursor.as_deref(), page_size).await {
                Ok(response) => response,
                Err(Error::Cancelled) => {
                    return Err(self.save_cancelled(&store, &session, &mut stats).await);
                }
                Err(e) => {
                    error!(
                        endpoint = target.name(),
                        page = session.page_count + 1,
                        error = %e,
                        "Fetch failed"
                    );
                    return Err(e);
                }
            };

            let page = PageResult::from_body(body);
            let page_total = page.total_count;
            if page_total.is_some() {
                total_count = page_total;
            }
            let next_cursor = page.next_cursor;

            let (next, delta) = session.absorb(page.items, self.config.max_results);
            session = next;
            stats.add_page(delta.accepted, delta.duplicates);

            info!(
                page = session.page_count,
                status,
                accepted = delta.accepted,
                duplicates = delta.duplicates,
                total = session.results.len(),
                cursor = next_cursor.as_deref().unwrap_or("-"),
                api_total = ?page_total,
                "Page processed"
            );

            if store.is_enabled() && session.page_count % interval == 0 {
                store
                    .save_progress(
                        next_cursor.as_deref(),
                        session.page_count,
                        &session.results,
                        false,
                    )
                    .await?;
                stats.add_checkpoint();
            }

            match session.advance(next_cursor.as_deref()) {
                CursorStep::Exhausted => break TerminationReason::NoCursor,
                CursorStep::Repeated(cursor) => {
                    warn!(
                        endpoint = target.name(),
                        cursor = %cursor,
                        page = session.page_count,
                        "Provider repeated a cursor, stopping"
                    );
                    break TerminationReason::CursorRepeat;
                }
                CursorStep::Continue(_) => {}
            }

            if session.is_full(self.config.max_results) {
                break TerminationReason::MaxResults;
            }

            let delay = self.page_delay();
            if sleep_cancellable(delay, &self.cancel).await.is_err() {
                return Err(self.save_cancelled(&store, &session, &mut stats).await);
            }
        };

        session.finish();
        if store.is_enabled() {
            store
                .save_progress(None, session.page_count, &session.results, true)
                .await?;
            stats.add_checkpoint();
        }

        stats.requests = self.client.requests_sent() - requests_before;
        stats.elapsed_ms = elapsed_ms(start);

        info!(
            endpoint = target.name(),
            reason = %reason,
            records = session.results.len(),
            pages = stats.pages,
            requests = stats.requests,
            "Fetch finished"
        );

        Ok(FetchOutcome {
            records: session.results,
            reason,
            stats,
            total_count,
        })
    }

    /// Issue one page request, falling back to the target's alternate
    /// request once if the provider rejects the first with 400
    async fn fetch_page(
        &self,
        target: &dyn PageTarget,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<(u16, Value)> {
        let spec = target
            .request(cursor, page_size)
            .timeout(self.config.request_timeout);

        match self
            .client
            .execute_with_retry(&spec, &self.config.retry, &self.cancel)
            .await
        {
            Err(Error::HttpStatus { status: 400, body }) => {
                let Some(fallback) = target.fallback_request(cursor, page_size) else {
                    return Err(Error::http_status(400, body));
                };
                warn!(
                    endpoint = target.name(),
                    body = %body,
                    "Request rejected with 400, retrying with alternate body"
                );
                let fallback = fallback.timeout(self.config.request_timeout);
                self.client
                    .execute_with_retry(&fallback, &self.config.retry, &self.cancel)
                    .await
            }
            other => other,
        }
    }

    async fn start_session(&self, store: &CheckpointStore) -> FetchSession {
        if !self.config.resume {
            return FetchSession::new();
        }

        match store.load().await {
            Some(record) => {
                info!(
                    page = record.page,
                    count = record.items.len(),
                    finished = record.finished,
                    "Resuming from checkpoint"
                );
                FetchSession::from_checkpoint(record)
            }
            None => FetchSession::new(),
        }
    }

    /// Persist a resumable checkpoint and build the cancellation error
    async fn save_cancelled(
        &self,
        store: &CheckpointStore,
        session: &FetchSession,
        stats: &mut FetchStats,
    ) -> Error {
        warn!(
            page = session.page_count,
            records = session.results.len(),
            "Fetch cancelled"
        );

        if store.is_enabled() {
            match store
                .save_progress(
                    session.cursor.as_deref(),
                    session.page_count,
                    &session.results,
                    false,
                )
                .await
            {
                Ok(()) => stats.add_checkpoint(),
                Err(e) => return e,
            }
        }

        Error::Cancelled
    }

    fn page_delay(&self) -> Duration {
        let (min, max) = self.config.delay_bounds();
        let secs = self.rng.uniform(min, max);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(self.config.max_delay)
    }
}

impl std::fmt::Debug for FetchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchEngine")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
