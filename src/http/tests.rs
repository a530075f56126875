//! Tests for the HTTP client module

use super::*;
use crate::error::Error;
use crate::random::FixedRandom;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(5))
}

fn client_for(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .api_key("secret")
        .build();
    HttpClient::with_config(config)
        .unwrap()
        .with_random(Arc::new(FixedRandom::lowest()))
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.base_url.is_none());
    assert!(config.api_key.is_none());
    assert_eq!(config.api_key_header, "X-API-KEY");
    assert!(config.rate_limit.is_none());
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.example.com")
        .timeout(Duration::from_secs(60))
        .api_key("k")
        .api_key_header("Header")
        .rate_limit(RateLimiterConfig::per_minute(20))
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, Some("https://api.example.com".to_string()));
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.api_key.as_deref(), Some("k"));
    assert_eq!(config.api_key_header, "Header");
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(20, 1)));
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");

    let client = HttpClient::with_config(config).unwrap();
    assert!(client.has_rate_limiter());
    assert_eq!(client.requests_sent(), 0);
}

#[test]
fn test_request_spec_builder() {
    let spec = RequestSpec::post("/search")
        .query("account_id", "acc")
        .query("limit", "100")
        .header("X-Request-Id", "abc123")
        .json(json!({"api": "classic"}))
        .timeout(Duration::from_secs(10));

    assert_eq!(spec.method, crate::types::Method::POST);
    assert_eq!(spec.query_value("account_id"), Some("acc"));
    assert_eq!(spec.query_value("limit"), Some("100"));
    assert_eq!(spec.query_value("cursor"), None);
    assert_eq!(
        spec.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert!(spec.body.is_some());
    assert_eq!(spec.timeout, Some(Duration::from_secs(10)));
}

#[test]
fn test_invalid_base_url_rejected() {
    let config = HttpClientConfig::builder().base_url("not a url").build();
    let err = HttpClient::with_config(config).unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[tokio::test]
async fn test_relative_path_without_base_url() {
    let client = HttpClient::new().unwrap();
    let err = client
        .execute_with_retry(
            &RequestSpec::get("/items"),
            &fast_policy(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
    assert_eq!(client.requests_sent(), 0);
}

// ============================================================================
// Success Path
// ============================================================================

#[tokio::test]
async fn test_execute_sends_query_body_and_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/linkedin/search"))
        .and(query_param("account_id", "acc"))
        .and(query_param("limit", "100"))
        .and(header("X-API-KEY", "secret"))
        .and(body_json(json!({"api": "sales_navigator", "keywords": "rh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "1"}],
            "cursor": "c1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let spec = RequestSpec::post("/api/v1/linkedin/search")
        .query("account_id", "acc")
        .query("limit", "100")
        .json(json!({"api": "sales_navigator", "keywords": "rh"}));

    let (status, body) = client
        .execute_with_retry(&spec, &fast_policy(3), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(status, 200);
    assert_eq!(body["cursor"], "c1");
    assert_eq!(client.requests_sent(), 1);
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (status, body) = client
        .execute_with_retry(
            &RequestSpec::get("/empty"),
            &fast_policy(2),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(status, 204);
    assert!(body.is_null());
}

#[tokio::test]
async fn test_non_json_success_body_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .execute_with_retry(
            &RequestSpec::get("/html"),
            &fast_policy(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
}

// ============================================================================
// Retry Behaviour
// ============================================================================

#[tokio::test]
async fn test_retry_after_429_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"error": "rate limit"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [], "paging": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (status, body) = client
        .execute_with_retry(
            &RequestSpec::post("/search"),
            &fast_policy(2),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(status, 200);
    assert_eq!(body["items"], json!([]));
    assert_eq!(client.requests_sent(), 2);
}

#[tokio::test]
async fn test_session_refresh_statuses_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/relations"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/relations"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/relations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (status, _) = client
        .execute_with_retry(
            &RequestSpec::get("/relations"),
            &fast_policy(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(status, 200);
    assert_eq!(client.requests_sent(), 3);
}

#[tokio::test]
async fn test_retries_exhausted_carries_last_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .execute_with_retry(
            &RequestSpec::post("/search"),
            &fast_policy(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        Error::RetriesExhausted { attempts, status } => {
            assert_eq!(attempts, 3);
            assert_eq!(status, Some(503));
        }
        other => panic!("Expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_retryable_status_fails_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad filter"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .execute_with_retry(
            &RequestSpec::post("/search"),
            &fast_policy(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad filter");
        }
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
    assert_eq!(client.requests_sent(), 1);
}

#[tokio::test]
async fn test_server_error_outside_retry_set_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/boom"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .execute_with_retry(
            &RequestSpec::get("/boom"),
            &fast_policy(4),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_timeout_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"slow": true}))
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"slow": false})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let spec = RequestSpec::get("/slow").timeout(Duration::from_millis(50));
    let (_, body) = client
        .execute_with_retry(&spec, &fast_policy(3), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(body["slow"], false);
    assert_eq!(client.requests_sent(), 2);
}

#[tokio::test]
async fn test_connection_error_propagates_after_last_attempt() {
    // Nothing listens on port 1
    let config = HttpClientConfig::builder()
        .base_url("http://127.0.0.1:1")
        .build();
    let client = HttpClient::with_config(config)
        .unwrap()
        .with_random(Arc::new(FixedRandom::lowest()));

    let err = client
        .execute_with_retry(
            &RequestSpec::get("/x"),
            &fast_policy(2),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http(_)));
    assert_eq!(client.requests_sent(), 2);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_before_first_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .execute_with_retry(&RequestSpec::get("/x"), &fast_policy(3), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(client.requests_sent(), 0);
}

#[tokio::test]
async fn test_cancel_interrupts_backoff() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let policy = RetryPolicy::new(5, Duration::from_secs(30), Duration::from_secs(60));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client
        .execute_with_retry(&RequestSpec::get("/limited"), &policy, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(client.requests_sent(), 1);
}
