//! Checkpoint module
//!
//! Durable fetch progress so a walk can stop and resume across restarts.
//!
//! # Overview
//!
//! The state module provides:
//! - `CheckpointRecord` - the on-disk snapshot (`cursor`, `page`, `count`,
//!   `items`, `updated_at`, `finished`)
//! - `CheckpointStore` - file persistence with atomic replace on save and
//!   best-effort load

mod manager;
mod types;

pub use manager::CheckpointStore;
pub use types::CheckpointRecord;
