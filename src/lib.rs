// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # cursor-harvest
//!
//! Resumable fetching of cursor-paginated HTTP endpoints that rate-limit,
//! fail intermittently and sometimes replay stale cursors.
//!
//! ## Features
//!
//! - **Retrying Requests**: Exponential backoff with jitter on 401/403/429/503/504 and transport errors
//! - **Cursor Walking**: Stops on a missing cursor, a replayed cursor, or a result cap
//! - **Deduplication**: Stable identity keys suppress records seen earlier in the fetch
//! - **Checkpoints**: Atomic on-disk snapshots so a fetch resumes after a restart
//! - **Politeness**: Randomised pauses between pages and an optional rate ceiling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cursor_harvest::engine::{FetchConfig, FetchEngine};
//! use cursor_harvest::http::{HttpClient, HttpClientConfig};
//! use cursor_harvest::targets::SearchTarget;
//!
//! #[tokio::main]
//! async fn main() -> cursor_harvest::Result<()> {
//!     let client = HttpClient::with_config(
//!         HttpClientConfig::builder()
//!             .base_url("https://api1.unipile.com:13111")
//!             .api_key(std::env::var("UNIPILE_TOKEN").unwrap_or_default())
//!             .build(),
//!     )?;
//!
//!     let engine = FetchEngine::new(client).with_config(
//!         FetchConfig::new()
//!             .with_max_results(2500)
//!             .with_checkpoint("leads.checkpoint.json"),
//!     );
//!
//!     let target = SearchTarget::sales_navigator("ACCOUNT", serde_json::json!({"keywords": "cto"}));
//!     let outcome = engine.run(&target).await?;
//!     println!("{} records ({})", outcome.records.len(), outcome.reason);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  FetchEngine (pagination walker)             │
//! │   resume → request → dedup → checkpoint → terminate? → delay │
//! └──────────────────────────────────────────────────────────────┘
//!                                │
//! ┌────────────┬─────────────┬───┴──────────┬────────────┬────────┐
//! │  Targets   │    HTTP     │  Pagination  │  Identity  │ State  │
//! ├────────────┼─────────────┼──────────────┼────────────┼────────┤
//! │ Search     │ Retry       │ PageResult   │ Key fields │ Atomic │
//! │ URL search │ Backoff     │ Cursor       │ Fallback   │ save   │
//! │ Relations  │ Rate limit  │ tracking     │ SeenKeys   │ Resume │
//! └────────────┴─────────────┴──────────────┴────────────┴────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Injectable randomness
pub mod random;

/// HTTP client with retry, backoff and rate limiting
pub mod http;

/// Record identity and deduplication
pub mod identity;

/// Page parsing and cursor tracking
pub mod pagination;

/// Checkpoint persistence
pub mod state;

/// Pagination walker
pub mod engine;

/// Request shapes for each endpoint
pub mod targets;

/// Job configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use engine::{FetchConfig, FetchEngine, FetchOutcome, FetchStats};
pub use http::{HttpClient, HttpClientConfig, RetryPolicy};
pub use state::{CheckpointRecord, CheckpointStore};
pub use targets::PageTarget;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
