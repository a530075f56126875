//! HTTP client with retry and rate limiting
//!
//! Provides the retrying request executor used by the fetch engine:
//! - Retries on the transient status set and on transport failures
//! - Exponential backoff with jitter between attempts
//! - Optional request-rate ceiling
//! - Cooperative cancellation at every network call and every sleep

use super::backoff::RetryPolicy;
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{Error, Result};
use crate::random::{RandomSource, ThreadRandom};
use crate::types::Method;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Default header carrying the API key
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-KEY";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// API key sent with every request
    pub api_key: Option<String>,
    /// Header name for the API key
    pub api_key_header: String,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            rate_limit: None,
            default_headers: HashMap::new(),
            user_agent: format!("cursor-harvest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Set the header the API key travels in
    pub fn api_key_header(mut self, header: impl Into<String>) -> Self {
        self.config.api_key_header = header.into();
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// One logical request, re-issued verbatim on every retry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSpec {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub path: String,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    /// Create a request spec
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    /// GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Look up a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Result of a single attempt that reached the server
enum Attempt {
    Success(u16, String),
    Retryable(u16),
    Rejected(u16, String),
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
    rng: Arc<dyn RandomSource>,
    requests_sent: AtomicU64,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        if let Some(base) = &config.base_url {
            Url::parse(base)?;
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
            rng: Arc::new(ThreadRandom),
            requests_sent: AtomicU64::new(0),
        })
    }

    /// Replace the random source used for backoff jitter
    #[must_use]
    pub fn with_random(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Requests put on the wire so far, retries included
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    /// Issue one logical request, retrying transient failures.
    ///
    /// Returns the status and parsed JSON body of the first 2xx response.
    /// Retryable statuses on the last attempt yield
    /// [`Error::RetriesExhausted`]; a transport failure on the last attempt is
    /// returned as [`Error::Http`]; any other non-2xx status fails at once
    /// with [`Error::HttpStatus`].
    pub async fn execute_with_retry(
        &self,
        spec: &RequestSpec,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<(u16, Value)> {
        let url = self.build_url(&spec.path)?;
        let attempts = policy.attempts();

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            if let Some(limiter) = &self.rate_limiter {
                tokio::select! {
                    () = limiter.wait() => {}
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                }
            }

            match self.send_once(&url, spec, policy).await {
                Ok(Attempt::Success(status, text)) => {
                    debug!("Request succeeded: {:?} {} ({})", spec.method, url, status);
                    return Ok((status, parse_body(&text)?));
                }
                Ok(Attempt::Rejected(status, body)) => {
                    return Err(Error::http_status(status, body));
                }
                Ok(Attempt::Retryable(status)) => {
                    if attempt >= attempts {
                        return Err(Error::RetriesExhausted {
                            attempts,
                            status: Some(status),
                        });
                    }
                    let wait = policy.backoff(attempt, self.rng.as_ref());
                    warn!(
                        "Retryable status {} (attempt {}/{}), waiting {:.1}s",
                        status,
                        attempt,
                        attempts,
                        wait.as_secs_f64()
                    );
                    sleep_cancellable(wait, cancel).await?;
                }
                Err(e) => {
                    if attempt >= attempts {
                        return Err(Error::Http(e));
                    }
                    let wait = policy.backoff(attempt, self.rng.as_ref());
                    warn!(
                        "Request error: {} (attempt {}/{}), waiting {:.1}s",
                        e,
                        attempt,
                        attempts,
                        wait.as_secs_f64()
                    );
                    sleep_cancellable(wait, cancel).await?;
                }
            }
        }

        Err(Error::RetriesExhausted {
            attempts,
            status: None,
        })
    }

    /// Put one request on the wire and classify what came back
    async fn send_once(
        &self,
        url: &Url,
        spec: &RequestSpec,
        policy: &RetryPolicy,
    ) -> std::result::Result<Attempt, reqwest::Error> {
        let mut req = self
            .client
            .request(spec.method.into(), url.clone())
            .header("accept", "application/json");

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(key) = &self.config.api_key {
            req = req.header(self.config.api_key_header.as_str(), key.as_str());
        }

        for (key, value) in &spec.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !spec.query.is_empty() {
            req = req.query(&spec.query);
        }

        if let Some(body) = &spec.body {
            req = req.json(body);
        }

        if let Some(timeout) = spec.timeout {
            req = req.timeout(timeout);
        }

        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        let response = req.send().await?;
        let status = response.status();

        if policy.is_retryable(status.as_u16()) {
            return Ok(Attempt::Retryable(status.as_u16()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(Attempt::Rejected(status.as_u16(), body));
        }

        let text = response.text().await?;
        Ok(Attempt::Success(status.as_u16(), text))
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                Ok(Url::parse(&format!("{base}/{path}"))?)
            }
            None => Err(Error::missing_field("base_url")),
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .field("has_api_key", &self.config.api_key.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Parse a 2xx body; an empty body is an empty page
fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| Error::decode(format!("response is not JSON: {e}")))
}

/// Sleep for `duration` unless `cancel` fires first
pub(crate) async fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    if duration.is_zero() {
        return if cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        };
    }

    tokio::select! {
        () = tokio::time::sleep(duration) => Ok(()),
        () = cancel.cancelled() => Err(Error::Cancelled),
    }
}
