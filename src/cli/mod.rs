//! CLI module
//!
//! Command-line interface for running fetch jobs.
//!
//! # Commands
//!
//! - `fetch` - Walk every page of a target and write the records
//! - `status` - Show a job's checkpoint
//! - `clear` - Delete a job's checkpoint

mod commands;
mod runner;

pub use commands::{Cli, Commands, FetchArgs, OutputFormat, TargetKind};
pub use runner::Runner;
