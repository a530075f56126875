//! Pagination module
//!
//! Turns provider responses into typed pages and tracks cursor consumption.
//!
//! # Overview
//!
//! The provider places the next cursor either at the top level (`cursor`) or
//! under a `paging` object, and may omit any field. [`PageResult::from_body`]
//! is the single place that knows about those shapes; the walker only ever
//! sees a [`PageResult`]. [`CursorTracker`] remembers every cursor a session
//! has requested so a replayed cursor ends the walk instead of looping.

mod types;

pub use types::{CursorStep, CursorTracker, PageResult};
