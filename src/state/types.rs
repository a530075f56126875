//! Checkpoint record
//!
//! Serialized to JSON and replaced atomically after processed pages.
//! `cursor = null` with `finished = true` marks a completed fetch; a non-null
//! cursor with `finished` absent or false marks a resumable one.

use crate::types::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of one logical fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Cursor of the next page to request
    #[serde(default)]
    pub cursor: Option<String>,

    /// Pages processed so far
    #[serde(default)]
    pub page: u32,

    /// Number of accumulated items
    #[serde(default)]
    pub count: usize,

    /// Accumulated, deduplicated items in first-seen order
    #[serde(default)]
    pub items: Vec<Record>,

    /// When the snapshot was written
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// Whether the walk terminated
    #[serde(default)]
    pub finished: bool,
}

impl CheckpointRecord {
    /// Snapshot of a walk still in progress
    pub fn in_progress(cursor: Option<String>, page: u32, items: Vec<Record>) -> Self {
        Self {
            cursor,
            page,
            count: items.len(),
            items,
            updated_at: Some(Utc::now()),
            finished: false,
        }
    }

    /// Snapshot of a terminated walk
    pub fn completed(page: u32, items: Vec<Record>) -> Self {
        Self {
            cursor: None,
            page,
            count: items.len(),
            items,
            updated_at: Some(Utc::now()),
            finished: true,
        }
    }

    /// Whether a resumed walk would continue from a pending cursor
    pub fn is_resumable(&self) -> bool {
        !self.finished && self.cursor.is_some()
    }
}

/// Borrowed form written by the store, so saving never clones the item list
#[derive(Debug, Serialize)]
pub(crate) struct CheckpointRef<'a> {
    pub cursor: Option<&'a str>,
    pub page: u32,
    pub count: usize,
    pub items: &'a [Record],
    pub updated_at: DateTime<Utc>,
    pub finished: bool,
}

impl<'a> CheckpointRef<'a> {
    pub fn new(cursor: Option<&'a str>, page: u32, items: &'a [Record], finished: bool) -> Self {
        Self {
            cursor,
            page,
            count: items.len(),
            items,
            updated_at: Utc::now(),
            finished,
        }
    }
}

impl<'a> From<&'a CheckpointRecord> for CheckpointRef<'a> {
    fn from(record: &'a CheckpointRecord) -> Self {
        Self {
            cursor: record.cursor.as_deref(),
            page: record.page,
            count: record.items.len(),
            items: &record.items,
            updated_at: record.updated_at.unwrap_or_else(Utc::now),
            finished: record.finished,
        }
    }
}
