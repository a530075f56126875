//! CLI commands and argument parsing

use crate::config::{JobConfig, RateLimiterSettings, TargetDef};
use crate::error::{Error, Result, ResultExt};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Resumable cursor-paginated fetcher
#[derive(Parser, Debug)]
#[command(name = "cursor-harvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Job definition file (YAML)
    #[arg(short, long, global = true)]
    pub job: Option<PathBuf>,

    /// Output format for summaries
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every page of a target and write the records
    Fetch(Box<FetchArgs>),

    /// Show the checkpoint of a job
    Status {
        /// Checkpoint file (defaults to the job's checkpoint_path)
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Delete the checkpoint of a job
    Clear {
        /// Checkpoint file (defaults to the job's checkpoint_path)
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Single-line JSON
    Json,
    /// Indented JSON
    Pretty,
}

/// Target kinds selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TargetKind {
    /// Sales Navigator people search (needs --criteria)
    SalesNavigator,
    /// Classic people search (needs --criteria)
    Classic,
    /// Search from a search page URL (needs --url)
    Url,
    /// Accepted connections
    Relations,
    /// Pending sent invitations
    InvitationsSent,
}

/// Flags for `fetch`; each one overrides the job file
#[derive(Args, Debug, Default)]
pub struct FetchArgs {
    /// API base URL
    #[arg(long, env = "UNIPILE_BASE_URL")]
    pub base_url: Option<String>,

    /// Account the requests act for
    #[arg(long, env = "UNIPILE_ACCOUNT_ID")]
    pub account_id: Option<String>,

    /// API key
    #[arg(long, env = "UNIPILE_TOKEN", hide_env_values = true)]
    pub api_key: Option<String>,

    /// What to fetch
    #[arg(long, value_enum)]
    pub target: Option<TargetKind>,

    /// Search criteria as a JSON object
    #[arg(long)]
    pub criteria: Option<String>,

    /// Search page URL for the url target
    #[arg(long)]
    pub url: Option<String>,

    /// Records per page
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Stop after this many records
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Minimum pause between pages, in seconds
    #[arg(long)]
    pub min_delay: Option<f64>,

    /// Maximum pause between pages, in seconds
    #[arg(long)]
    pub max_delay: Option<f64>,

    /// Checkpoint file
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Write a checkpoint every N pages
    #[arg(long)]
    pub checkpoint_every: Option<u32>,

    /// Total attempts per request
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Request timeout, in seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Requests per minute ceiling
    #[arg(long)]
    pub rate_limit: Option<u32>,

    /// Ignore any existing checkpoint
    #[arg(long)]
    pub fresh: bool,

    /// Where to write the fetched records
    #[arg(short, long, default_value = "results.json")]
    pub output: PathBuf,
}

impl FetchArgs {
    /// Overlay these flags on a job
    pub fn apply(&self, job: &mut JobConfig) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            job.base_url.clone_from(base_url);
        }
        if let Some(account_id) = &self.account_id {
            job.account_id.clone_from(account_id);
        }
        if let Some(api_key) = &self.api_key {
            job.api_key = Some(api_key.clone());
        }

        if let Some(kind) = self.target {
            job.target = Some(self.target_def(kind)?);
        } else if let (Some(criteria), Some(target)) = (&self.criteria, job.target.as_mut()) {
            // Criteria alone replace those of a search target from the job file
            match target {
                TargetDef::SalesNavigatorSearch { criteria: c }
                | TargetDef::ClassicSearch { criteria: c } => *c = parse_criteria(criteria)?,
                _ => return Err(Error::config("--criteria only applies to search targets")),
            }
        }

        let fetch = &mut job.fetch;
        if let Some(size) = self.page_size {
            fetch.page_size = size;
        }
        if self.max_results.is_some() {
            fetch.max_results = self.max_results;
        }
        if let Some(min) = self.min_delay {
            fetch.min_delay_secs = min;
        }
        if let Some(max) = self.max_delay {
            fetch.max_delay_secs = max;
        }
        if let Some(path) = &self.checkpoint {
            fetch.checkpoint_path = Some(path.clone());
        }
        if let Some(every) = self.checkpoint_every {
            fetch.checkpoint_every = every;
        }
        if let Some(timeout) = self.timeout {
            fetch.request_timeout_secs = timeout;
        }
        if self.fresh {
            fetch.resume = false;
        }
        if let Some(retries) = self.max_retries {
            job.retry.max_retries = retries;
        }
        if let Some(rpm) = self.rate_limit {
            job.rate_limit = Some(RateLimiterSettings {
                requests_per_minute: rpm,
                burst_size: 1,
            });
        }

        Ok(())
    }

    fn target_def(&self, kind: TargetKind) -> Result<TargetDef> {
        let criteria = || {
            self.criteria
                .as_deref()
                .map_or(Ok(serde_json::Value::Object(serde_json::Map::new())), parse_criteria)
        };

        Ok(match kind {
            TargetKind::SalesNavigator => TargetDef::SalesNavigatorSearch {
                criteria: criteria()?,
            },
            TargetKind::Classic => TargetDef::ClassicSearch {
                criteria: criteria()?,
            },
            TargetKind::Url => TargetDef::UrlSearch {
                url: self
                    .url
                    .clone()
                    .ok_or_else(|| Error::config("--target url needs --url"))?,
            },
            TargetKind::Relations => TargetDef::Relations,
            TargetKind::InvitationsSent => TargetDef::InvitationsSent,
        })
    }
}

fn parse_criteria(text: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(text).context("--criteria is not valid JSON")?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(Error::config("--criteria must be a JSON object"))
    }
}
