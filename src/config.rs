//! Job configuration
//!
//! A job file names the API endpoint, the account, what to fetch and how.
//! Everything except `base_url`, `account_id` and `target` has a default.
//!
//! ```yaml
//! base_url: https://api1.unipile.com:13111
//! account_id: A1b2C3
//! api_key_env: UNIPILE_TOKEN
//! target:
//!   type: sales_navigator_search
//!   criteria:
//!     keywords: platform engineer
//! fetch:
//!   max_results: 2500
//!   checkpoint_path: leads.checkpoint.json
//! ```

use crate::engine::FetchConfig;
use crate::error::{Error, Result, ResultExt};
use crate::http::{HttpClientConfig, RateLimiterConfig, RetryPolicy, DEFAULT_API_KEY_HEADER};
use crate::targets::{
    InvitationsSentTarget, PageTarget, RelationsTarget, SearchApi, SearchTarget, UrlSearchTarget,
};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when no key is configured
pub const DEFAULT_API_KEY_ENV: &str = "UNIPILE_TOKEN";

// ============================================================================
// Job Config
// ============================================================================

/// One fetch job, as read from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// API base URL
    #[serde(default)]
    pub base_url: String,

    /// Account the requests act for
    #[serde(default)]
    pub account_id: String,

    /// Inline API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Header carrying the API key
    #[serde(default)]
    pub api_key_header: Option<String>,

    /// What to fetch
    #[serde(default)]
    pub target: Option<TargetDef>,

    /// Walk settings
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Retry settings
    #[serde(default)]
    pub retry: RetrySettings,

    /// Optional request-rate ceiling
    #[serde(default)]
    pub rate_limit: Option<RateLimiterSettings>,
}

impl JobConfig {
    /// Load a job from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    /// Parse a job from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Check the job is runnable
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::missing_field("base_url"));
        }
        url::Url::parse(self.base_url.trim())?;

        if self.account_id.trim().is_empty() {
            return Err(Error::missing_field("account_id"));
        }

        match &self.target {
            None => return Err(Error::missing_field("target")),
            Some(TargetDef::UrlSearch { url }) if url.trim().is_empty() => {
                return Err(Error::config("url_search target needs a non-empty url"));
            }
            Some(_) => {}
        }

        self.fetch.validate()?;
        self.retry.validate()
    }

    /// API key from the inline value or the configured environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        let var = self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
        std::env::var(var).ok().filter(|k| !k.is_empty())
    }

    /// HTTP client configuration
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.base_url.trim())
            .timeout(secs(self.fetch.request_timeout_secs))
            .api_key_header(
                self.api_key_header
                    .as_deref()
                    .unwrap_or(DEFAULT_API_KEY_HEADER),
            );

        if let Some(key) = self.resolve_api_key() {
            builder = builder.api_key(key);
        }
        if let Some(limit) = &self.rate_limit {
            builder = builder.rate_limit(RateLimiterConfig::new(
                limit.requests_per_minute,
                limit.burst_size,
            ));
        }

        builder.build()
    }

    /// Engine configuration
    pub fn fetch_config(&self) -> FetchConfig {
        let fetch = &self.fetch;
        FetchConfig {
            page_size: fetch.page_size,
            max_results: fetch.max_results,
            min_delay: secs(fetch.min_delay_secs),
            max_delay: secs(fetch.max_delay_secs),
            checkpoint_path: fetch.checkpoint_path.clone(),
            checkpoint_every: fetch.checkpoint_every,
            resume: fetch.resume,
            request_timeout: secs(fetch.request_timeout_secs),
            retry: self.retry.policy(),
        }
    }

    /// The configured page target
    pub fn page_target(&self) -> Result<Box<dyn PageTarget>> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| Error::missing_field("target"))?;
        Ok(target.build(&self.account_id))
    }
}

/// Seconds to a duration, saturating; negative or NaN is zero
fn secs(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

fn check_secs(field: &str, value: f64) -> Result<()> {
    if Duration::try_from_secs_f64(value).is_ok() {
        Ok(())
    } else {
        Err(Error::config(format!(
            "{field} must be a non-negative number of seconds, got {value}"
        )))
    }
}

// ============================================================================
// Target Definition
// ============================================================================

/// What a job fetches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetDef {
    /// Sales Navigator people search
    SalesNavigatorSearch {
        #[serde(default)]
        criteria: JsonValue,
    },

    /// Classic people search
    ClassicSearch {
        #[serde(default)]
        criteria: JsonValue,
    },

    /// Search from a pasted search URL
    UrlSearch { url: String },

    /// Accepted connections
    Relations,

    /// Pending sent invitations
    InvitationsSent,
}

impl TargetDef {
    /// Build the target for `account_id`
    pub fn build(&self, account_id: &str) -> Box<dyn PageTarget> {
        match self {
            Self::SalesNavigatorSearch { criteria } => Box::new(SearchTarget::new(
                account_id,
                SearchApi::SalesNavigator,
                criteria.clone(),
            )),
            Self::ClassicSearch { criteria } => Box::new(SearchTarget::new(
                account_id,
                SearchApi::Classic,
                criteria.clone(),
            )),
            Self::UrlSearch { url } => Box::new(UrlSearchTarget::new(account_id, url)),
            Self::Relations => Box::new(RelationsTarget::new(account_id)),
            Self::InvitationsSent => Box::new(InvitationsSentTarget::new(account_id)),
        }
    }
}

// ============================================================================
// Fetch Settings
// ============================================================================

/// Walk settings, with delays in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub max_results: Option<usize>,

    #[serde(default = "default_min_delay")]
    pub min_delay_secs: f64,

    #[serde(default = "default_max_delay")]
    pub max_delay_secs: f64,

    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,

    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u32,

    #[serde(default = "default_true")]
    pub resume: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: f64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_results: None,
            min_delay_secs: default_min_delay(),
            max_delay_secs: default_max_delay(),
            checkpoint_path: None,
            checkpoint_every: default_checkpoint_every(),
            resume: true,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl FetchSettings {
    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::config("page_size must be at least 1"));
        }
        if self.checkpoint_every == 0 {
            return Err(Error::config("checkpoint_every must be at least 1"));
        }
        check_secs("min_delay_secs", self.min_delay_secs)?;
        check_secs("max_delay_secs", self.max_delay_secs)?;
        check_secs("request_timeout_secs", self.request_timeout_secs)?;
        if self.min_delay_secs > self.max_delay_secs {
            return Err(Error::config(format!(
                "min_delay_secs ({}) exceeds max_delay_secs ({})",
                self.min_delay_secs, self.max_delay_secs
            )));
        }
        Ok(())
    }
}

fn default_page_size() -> usize {
    100
}

fn default_min_delay() -> f64 {
    1.0
}

fn default_max_delay() -> f64 {
    2.0
}

fn default_checkpoint_every() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> f64 {
    30.0
}

// ============================================================================
// Retry Settings
// ============================================================================

/// Retry settings, with delays in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay")]
    pub base_delay_secs: f64,

    #[serde(default = "default_delay_cap")]
    pub delay_cap_secs: f64,

    #[serde(default = "default_jitter")]
    pub jitter_fraction: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay(),
            delay_cap_secs: default_delay_cap(),
            jitter_fraction: default_jitter(),
        }
    }
}

impl RetrySettings {
    fn validate(&self) -> Result<()> {
        check_secs("base_delay_secs", self.base_delay_secs)?;
        check_secs("delay_cap_secs", self.delay_cap_secs)?;
        if !(self.jitter_fraction.is_finite() && self.jitter_fraction >= 0.0) {
            return Err(Error::config("jitter_fraction must be a non-negative number"));
        }
        Ok(())
    }

    /// Retry policy these settings describe
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            secs(self.base_delay_secs),
            secs(self.delay_cap_secs),
        )
        .with_jitter(self.jitter_fraction)
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay() -> f64 {
    1.5
}

fn default_delay_cap() -> f64 {
    60.0
}

fn default_jitter() -> f64 {
    0.2
}

/// Rate ceiling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterSettings {
    pub requests_per_minute: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_burst() -> u32 {
    1
}
