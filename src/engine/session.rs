//! Per-fetch session state
//!
//! A [`FetchSession`] is owned by one `FetchEngine::run` call. Each page is
//! folded into it by value, producing the session the next page starts from.

use crate::identity::{Admission, SeenKeys};
use crate::pagination::{CursorStep, CursorTracker};
use crate::state::CheckpointRecord;
use crate::types::Record;
use tracing::trace;

/// Mutable state of one logical fetch
#[derive(Debug, Clone, Default)]
pub struct FetchSession {
    /// Cursor of the next page to request (`None` = first page or done)
    pub cursor: Option<String>,
    /// Accepted records in first-seen order
    pub results: Vec<Record>,
    /// Identity keys already admitted
    pub seen_keys: SeenKeys,
    /// Cursors already requested
    pub cursors: CursorTracker,
    /// Pages processed
    pub page_count: u32,
    /// Set once no more pages will be fetched
    pub finished: bool,
}

/// What merging one page changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageDelta {
    pub accepted: usize,
    pub duplicates: usize,
    /// Items left unread because the result cap was hit mid-page
    pub truncated: usize,
}

impl FetchSession {
    /// Fresh session starting at the first page
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a session from a checkpoint
    ///
    /// In-progress checkpoints continue from their cursor. A finished one
    /// starts again from the first page with its items pre-seeded, so only
    /// records not seen before are added.
    pub fn from_checkpoint(record: CheckpointRecord) -> Self {
        let seen_keys = SeenKeys::from_records(&record.items);
        let (cursor, page_count) = if record.finished {
            (None, 0)
        } else {
            (record.cursor, record.page)
        };

        Self {
            cursor,
            results: record.items,
            seen_keys,
            cursors: CursorTracker::new(),
            page_count,
            finished: false,
        }
    }

    /// Whether `max_results` has been reached
    pub fn is_full(&self, max_results: Option<usize>) -> bool {
        max_results.is_some_and(|max| self.results.len() >= max)
    }

    /// Mark the current cursor as requested and return it
    pub fn begin_page(&mut self) -> Option<String> {
        let cursor = self.cursor.clone();
        if let Some(cursor) = cursor.as_deref() {
            self.cursors.consume(cursor);
        }
        cursor
    }

    /// Fold one page of items into the session
    ///
    /// Items go through the dedup filter in page order; merging stops as soon
    /// as `max_results` is reached.
    pub fn absorb(mut self, items: Vec<Record>, max_results: Option<usize>) -> (Self, PageDelta) {
        let mut delta = PageDelta::default();
        let total = items.len();

        for (index, item) in items.into_iter().enumerate() {
            if self.is_full(max_results) {
                delta.truncated = total - index;
                break;
            }

            match self.seen_keys.admit(&item) {
                Admission::Duplicate(key) => {
                    trace!(key = %key, "Skipping duplicate record");
                    delta.duplicates += 1;
                }
                Admission::New(_) | Admission::Unkeyed => {
                    self.results.push(item);
                    delta.accepted += 1;
                }
            }
        }

        self.page_count += 1;
        (self, delta)
    }

    /// Classify the cursor a page returned, adopting it when fresh
    pub fn advance(&mut self, next_cursor: Option<&str>) -> CursorStep {
        let step = self.cursors.step(next_cursor);
        if let CursorStep::Continue(cursor) = &step {
            self.cursor = Some(cursor.clone());
        }
        step
    }

    /// Mark the walk as terminated
    pub fn finish(&mut self) {
        self.cursor = None;
        self.finished = true;
    }
}
