//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: YAML job → paged HTTP requests → records
//! and checkpoints on disk

use clap::Parser;
use cursor_harvest::cli::{Cli, Runner};
use cursor_harvest::config::JobConfig;
use cursor_harvest::engine::{FetchConfig, FetchEngine};
use cursor_harvest::http::{HttpClient, HttpClientConfig, RetryPolicy};
use cursor_harvest::random::FixedRandom;
use cursor_harvest::state::CheckpointStore;
use cursor_harvest::targets::SearchTarget;
use cursor_harvest::{Error, TerminationReason};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH: &str = "/api/v1/linkedin/search";

fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(4, Duration::from_millis(1), Duration::from_millis(4))
}

fn engine(server: &MockServer, config: FetchConfig) -> FetchEngine {
    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(server.uri())
            .api_key("token-123")
            .build(),
    )
    .unwrap()
    .with_random(Arc::new(FixedRandom::lowest()));

    FetchEngine::new(client)
        .with_config(config.without_delay().with_retry(quick_retry()))
        .with_random(Arc::new(FixedRandom::lowest()))
}

fn people(range: std::ops::Range<u32>) -> Vec<Value> {
    range
        .map(|i| json!({"public_identifier": format!("person-{i}"), "name": format!("P{i}")}))
        .collect()
}

async fn mount_search_page(server: &MockServer, cursor: Option<&str>, response: ResponseTemplate) {
    let mock = Mock::given(method("POST")).and(path(SEARCH));
    let mock = match cursor {
        Some(cursor) => mock.and(query_param("cursor", cursor)),
        None => mock.and(query_param_is_missing("cursor")),
    };
    mock.respond_with(response).mount(server).await;
}

// ============================================================================
// Engine Integration Tests
// ============================================================================

#[tokio::test]
async fn test_search_fetch_with_flaky_provider() {
    let server = MockServer::start().await;

    // Session refresh race on the first call
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_search_page(
        &server,
        None,
        ResponseTemplate::new(200).set_body_json(json!({
            "items": people(0..3),
            "paging": {"cursor": "p2", "total_count": 5}
        })),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .and(query_param("cursor", "p2"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_search_page(
        &server,
        Some("p2"),
        ResponseTemplate::new(200).set_body_json(json!({
            "items": people(2..5),
            "cursor": null,
            "paging": {"total_count": 5}
        })),
    )
    .await;

    let target = SearchTarget::sales_navigator("acc-9", json!({"keywords": "rust"}));
    let outcome = engine(&server, FetchConfig::new()).run(&target).await.unwrap();

    assert_eq!(outcome.records, people(0..5));
    assert_eq!(outcome.reason, TerminationReason::NoCursor);
    assert_eq!(outcome.total_count, Some(5));
    assert_eq!(outcome.stats.requests, 5);
    assert_eq!(outcome.stats.duplicates_skipped, 1);

    let requests = server.received_requests().await.unwrap();
    for request in &requests {
        assert_eq!(
            request.headers.get("X-API-KEY").map(|v| v.to_str().unwrap()),
            Some("token-123")
        );
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["api"], "sales_navigator");
        assert_eq!(body["keywords"], "rust");
    }
}

#[tokio::test]
async fn test_interrupted_fetch_resumes_without_duplicates() {
    let dir = tempdir().unwrap();
    let ckpt = dir.path().join("search.checkpoint.json");
    let config = FetchConfig::new().with_checkpoint(&ckpt);

    let server = MockServer::start().await;
    mount_search_page(
        &server,
        None,
        ResponseTemplate::new(200).set_body_json(json!({"items": people(0..2), "cursor": "p2"})),
    )
    .await;
    mount_search_page(
        &server,
        Some("p2"),
        ResponseTemplate::new(200).set_body_json(json!({"items": people(2..4), "cursor": "p3"})),
    )
    .await;
    mount_search_page(&server, Some("p3"), ResponseTemplate::new(429)).await;

    let target = SearchTarget::sales_navigator("acc-9", json!({}));
    let err = engine(&server, config.clone()).run(&target).await.unwrap_err();
    assert!(matches!(err, Error::RetriesExhausted { status: Some(429), .. }));

    let saved = CheckpointStore::new(&ckpt).load().await.unwrap();
    assert_eq!(saved.cursor.as_deref(), Some("p3"));
    assert_eq!(saved.page, 2);
    assert_eq!(saved.count, 4);

    // Provider recovers; the next run picks up at p3
    server.reset().await;
    mount_search_page(
        &server,
        Some("p3"),
        ResponseTemplate::new(200).set_body_json(json!({"items": people(3..6)})),
    )
    .await;

    let outcome = engine(&server, config).run(&target).await.unwrap();

    assert_eq!(outcome.records, people(0..6));
    assert_eq!(outcome.stats.pages, 1);
    assert_eq!(outcome.stats.duplicates_skipped, 1);

    let finished = CheckpointStore::new(&ckpt).load().await.unwrap();
    assert!(finished.finished);
    assert_eq!(finished.cursor, None);
    assert_eq!(finished.page, 3);
}

// ============================================================================
// CLI Integration Tests
// ============================================================================

#[tokio::test]
async fn test_cli_fetch_from_job_file() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/invite/sent"))
        .and(query_param("account_id", "acc-7"))
        .and(query_param("limit", "100"))
        .and(header("X-API-KEY", "job-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"items": [{"id": "inv-1"}, {"id": "inv-2"}], "cursor": null})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let job_path = dir.path().join("job.yaml");
    let checkpoint = dir.path().join("invites.json");
    std::fs::write(
        &job_path,
        format!(
            "base_url: {}\naccount_id: acc-7\napi_key: job-key\ntarget:\n  type: invitations_sent\nfetch:\n  min_delay_secs: 0\n  max_delay_secs: 0\n  checkpoint_path: {}\n",
            server.uri(),
            checkpoint.display()
        ),
    )
    .unwrap();

    let job = JobConfig::from_file(&job_path).unwrap();
    job.validate().unwrap();

    let output = dir.path().join("results.json");
    let cli = Cli::try_parse_from([
        "cursor-harvest",
        "--job",
        job_path.to_str().unwrap(),
        "--format",
        "json",
        "fetch",
        "--output",
        output.to_str().unwrap(),
    ])
    .unwrap();
    Runner::new(cli).run().await.unwrap();

    let written: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, vec![json!({"id": "inv-1"}), json!({"id": "inv-2"})]);
    assert!(CheckpointStore::new(&checkpoint).load().await.unwrap().finished);

    // clear removes the job's checkpoint
    let cli = Cli::try_parse_from(["cursor-harvest", "--job", job_path.to_str().unwrap(), "clear"])
        .unwrap();
    Runner::new(cli).run().await.unwrap();
    assert!(!checkpoint.exists());
}

#[tokio::test]
async fn test_cli_fetch_fatal_status_fails() {
    let dir = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEARCH))
        .and(body_partial_json(json!({"url": "https://example.com/search?q=1"})))
        .respond_with(ResponseTemplate::new(422).set_body_string("unsupported url"))
        .expect(1)
        .mount(&server)
        .await;

    let output = dir.path().join("results.json");
    let uri = server.uri();
    let cli = Cli::try_parse_from([
        "cursor-harvest",
        "fetch",
        "--base-url",
        uri.as_str(),
        "--account-id",
        "acc",
        "--api-key",
        "k",
        "--target",
        "url",
        "--url",
        " https://example.com/search?q=1 ",
        "--min-delay",
        "0",
        "--max-delay",
        "0",
        "--output",
        output.to_str().unwrap(),
    ])
    .unwrap();

    let err = Runner::new(cli).run().await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 422, .. }));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_cli_status_without_checkpoint() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("none.json");
    let cli = Cli::try_parse_from(["cursor-harvest", "status", "--checkpoint", path.to_str().unwrap()])
        .unwrap();
    Runner::new(cli).run().await.unwrap();
}
