//! Page and cursor types
//!
//! Defines the typed page the walker consumes and the replay detector.

use crate::types::Record;
use serde_json::Value;
use std::collections::HashSet;

/// One page as the walker sees it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    /// Records on this page, in provider order
    pub items: Vec<Record>,
    /// Cursor for the following page, if any
    pub next_cursor: Option<String>,
    /// Provider's estimate of the total result count
    pub total_count: Option<u64>,
}

impl PageResult {
    /// Parse a response body.
    ///
    /// Every field is optional. The cursor is taken from the top-level
    /// `cursor` first, then `paging.cursor`; the total from
    /// `paging.total_count`, then a top-level `total_count`. Numeric cursors
    /// are stringified; empty strings and other values count as absent.
    pub fn from_body(body: Value) -> Self {
        let Value::Object(mut map) = body else {
            return Self::default();
        };

        let items = match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        let paging = map.get("paging");

        let next_cursor = map
            .get("cursor")
            .and_then(cursor_text)
            .or_else(|| paging.and_then(|p| p.get("cursor")).and_then(cursor_text));

        let total_count = paging
            .and_then(|p| p.get("total_count"))
            .and_then(count_value)
            .or_else(|| map.get("total_count").and_then(count_value));

        Self {
            items,
            next_cursor,
            total_count,
        }
    }

    /// Check if the page carried no records
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn cursor_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Outcome of inspecting the cursor a page returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorStep {
    /// Fresh cursor; fetch the next page with it
    Continue(String),
    /// Provider signalled the end
    Exhausted,
    /// Cursor was already requested this session
    Repeated(String),
}

/// Cursors already requested by one session
#[derive(Debug, Clone, Default)]
pub struct CursorTracker {
    seen: HashSet<String>,
}

impl CursorTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a request is being issued with `cursor`
    pub fn consume(&mut self, cursor: &str) {
        self.seen.insert(cursor.to_string());
    }

    /// Classify the cursor a page handed back
    pub fn step(&self, next: Option<&str>) -> CursorStep {
        match next {
            None => CursorStep::Exhausted,
            Some(c) if self.seen.contains(c) => CursorStep::Repeated(c.to_string()),
            Some(c) => CursorStep::Continue(c.to_string()),
        }
    }

    /// Check if a cursor has been requested
    pub fn contains(&self, cursor: &str) -> bool {
        self.seen.contains(cursor)
    }

    /// Number of distinct cursors requested
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
