//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock to stand in for both the listing and detail
//! endpoints and drive the coordinator end-to-end: pagination, bounded
//! fan-out, per-item failure isolation, idempotent storage, and the
//! stopping condition.

use apkscout::config::{CatalogConfig, Config, CrawlerConfig, StorageConfig};
use apkscout::crawler::Coordinator;
use apkscout::storage::{open_storage, RecordStore, RunStatus};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(
    server: &MockServer,
    db_path: &str,
    page_size: u32,
    target_records: Option<u64>,
) -> Config {
    Config {
        catalog: CatalogConfig {
            listing_url: format!("{}/apk_table_info", server.uri()),
            detail_url: format!("{}/detail_report", server.uri()),
            page_size,
            ineligible_status: "UnDetected".to_string(),
        },
        crawler: CrawlerConfig {
            max_concurrency: 4,
            target_records,
            request_timeout_secs: 5,
            user_agents: vec![],
        },
        storage: StorageConfig {
            database_path: db_path.to_string(),
        },
    }
}

fn listing_row(id: &str, status: &str) -> serde_json::Value {
    json!([1, id, "App", status, "2021-01-01"])
}

fn detail_body(id: &str, name: &str) -> serde_json::Value {
    json!({ "general": ["x", "1609459200", id, "x", "x", name] })
}

/// Mounts an empty listing page at the given offset
async fn mount_empty_page(server: &MockServer, offset: u32) {
    Mock::given(method("POST"))
        .and(path("/apk_table_info"))
        .and(body_string_contains(format!("iDisplayStart={}&", offset)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "aaData": [] })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_stores_eligible_records() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");

    Mock::given(method("POST"))
        .and(path("/apk_table_info"))
        .and(body_string_contains("iDisplayStart=0&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "aaData": [
                listing_row("id1", "Detected"),
                listing_row("id2", "UnDetected"),
                listing_row("id3", "Detected"),
            ]
        })))
        .mount(&server)
        .await;
    mount_empty_page(&server, 3).await;

    Mock::given(method("POST"))
        .and(path("/detail_report"))
        .and(query_param("apk_md5", "id1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("id1", "AppOne")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/detail_report"))
        .and(query_param("apk_md5", "id3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("id3", "AppThree")))
        .mount(&server)
        .await;

    // The filtered identifier must never be fetched
    Mock::given(method("POST"))
        .and(path("/detail_report"))
        .and(query_param("apk_md5", "id2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("id2", "AppTwo")))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, db_path.to_str().unwrap(), 3, None);
    let mut coordinator = Coordinator::new(config, "test-hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.stored, 2);
    assert_eq!(summary.failed, 0);

    let store = open_storage(Path::new(db_path.to_str().unwrap())).unwrap();
    assert_eq!(store.count_records().unwrap(), 2);

    let record = store.get_record("id1").unwrap().unwrap();
    assert_eq!(record.name, "AppOne");
    assert!(store.get_record("id2").unwrap().is_none());

    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.stored, 2);
}

#[tokio::test]
async fn test_batch_isolation_counts_failures_exactly() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");

    Mock::given(method("POST"))
        .and(path("/apk_table_info"))
        .and(body_string_contains("iDisplayStart=0&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "aaData": [
                listing_row("ok1", "Detected"),
                listing_row("bad1", "Detected"),
                listing_row("ok2", "Detected"),
                listing_row("bad2", "Detected"),
            ]
        })))
        .mount(&server)
        .await;
    mount_empty_page(&server, 4).await;

    for id in ["ok1", "ok2"] {
        Mock::given(method("POST"))
            .and(path("/detail_report"))
            .and(query_param("apk_md5", id))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(id, "GoodApp")))
            .mount(&server)
            .await;
    }

    // Simulated transport failures
    for id in ["bad1", "bad2"] {
        Mock::given(method("POST"))
            .and(path("/detail_report"))
            .and(query_param("apk_md5", id))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
    }

    let config = create_test_config(&server, db_path.to_str().unwrap(), 4, None);
    let mut coordinator = Coordinator::new(config, "test-hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    // Exactly K failures fail, N-K are stored, and the run still completes
    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.stored, 2);
    assert_eq!(summary.failed, 2);

    let store = open_storage(Path::new(db_path.to_str().unwrap())).unwrap();
    assert_eq!(store.count_records().unwrap(), 2);
}

#[tokio::test]
async fn test_unparseable_detail_counts_as_failure_without_store_write() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");

    Mock::given(method("POST"))
        .and(path("/apk_table_info"))
        .and(body_string_contains("iDisplayStart=0&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "aaData": [
                listing_row("good", "Detected"),
                listing_row("short", "Detected"),
            ]
        })))
        .mount(&server)
        .await;
    mount_empty_page(&server, 2).await;

    Mock::given(method("POST"))
        .and(path("/detail_report"))
        .and(query_param("apk_md5", "good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("good", "GoodApp")))
        .mount(&server)
        .await;

    // A general array too short to carry the name field
    Mock::given(method("POST"))
        .and(path("/detail_report"))
        .and(query_param("apk_md5", "short"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "general": ["x", "1609459200"] })),
        )
        .mount(&server)
        .await;

    let config = create_test_config(&server, db_path.to_str().unwrap(), 2, None);
    let mut coordinator = Coordinator::new(config, "test-hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.stored, 1);
    assert_eq!(summary.failed, 1);

    let store = open_storage(Path::new(db_path.to_str().unwrap())).unwrap();
    assert_eq!(store.count_records().unwrap(), 1);
    assert!(store.get_record("short").unwrap().is_none());
}

#[tokio::test]
async fn test_stopping_condition_dispatches_exactly_three_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");

    // Three full pages of 100 identifiers each
    for page in 0..3u32 {
        let rows: Vec<serde_json::Value> = (0..100)
            .map(|i| listing_row(&format!("id{}", page * 100 + i), "Detected"))
            .collect();

        Mock::given(method("POST"))
            .and(path("/apk_table_info"))
            .and(body_string_contains(format!(
                "iDisplayStart={}&",
                page * 100
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "aaData": rows })))
            .mount(&server)
            .await;
    }

    // A fourth page must never be requested once the target is reached
    Mock::given(method("POST"))
        .and(path("/apk_table_info"))
        .and(body_string_contains("iDisplayStart=300&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "aaData": [] })))
        .expect(0)
        .mount(&server)
        .await;

    // All detail fetches succeed
    Mock::given(method("POST"))
        .and(path("/detail_report"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("any", "AnyApp")))
        .mount(&server)
        .await;

    let config = create_test_config(&server, db_path.to_str().unwrap(), 100, Some(300));
    let mut coordinator = Coordinator::new(config, "test-hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.attempted, 300);
    assert_eq!(summary.stored, 300);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_malformed_listing_aborts_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");

    Mock::given(method("POST"))
        .and(path("/apk_table_info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("definitely not json"))
        .mount(&server)
        .await;

    let config = create_test_config(&server, db_path.to_str().unwrap(), 10, None);
    let mut coordinator = Coordinator::new(config, "test-hash").unwrap();

    let result = coordinator.run().await;
    assert!(result.is_err());

    // The run is recorded as failed, not left dangling
    let store = open_storage(Path::new(db_path.to_str().unwrap())).unwrap();
    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_repeated_runs_do_not_duplicate_records() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");

    Mock::given(method("POST"))
        .and(path("/apk_table_info"))
        .and(body_string_contains("iDisplayStart=0&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "aaData": [listing_row("id1", "Detected")]
        })))
        .mount(&server)
        .await;
    mount_empty_page(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/detail_report"))
        .and(query_param("apk_md5", "id1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("id1", "AppOne")))
        .mount(&server)
        .await;

    for _ in 0..2 {
        let config = create_test_config(&server, db_path.to_str().unwrap(), 1, None);
        let mut coordinator = Coordinator::new(config, "test-hash").unwrap();
        let summary = coordinator.run().await.unwrap();
        assert_eq!(summary.stored, 1);
    }

    // Same identifier crawled twice: still exactly one row
    let store = open_storage(Path::new(db_path.to_str().unwrap())).unwrap();
    assert_eq!(store.count_records().unwrap(), 1);
}
