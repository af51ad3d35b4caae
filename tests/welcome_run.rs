//! End-to-end runs of the poller against a mock instance.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use tempfile::TempDir;

use welcome_bot::config::ConfigError;
use welcome_bot::connectors::{ApiCredentials, ApiError, MastodonClient};
use welcome_bot::poller::{PollerError, PollerOptions, WatermarkPoller};
use welcome_bot::watermark::FileWatermarkStore;

const TOKEN: &str = "integration-token";

fn poller(server: &ServerGuard, watermark_path: &Path) -> WatermarkPoller {
    paced_poller(server, watermark_path, Duration::ZERO)
}

fn paced_poller(
    server: &ServerGuard,
    watermark_path: &Path,
    interval: Duration,
) -> WatermarkPoller {
    let client = MastodonClient::new(ApiCredentials::new(server.url(), TOKEN)).unwrap();
    let options = PollerOptions {
        welcome_template: "@{username} welcome!".to_string(),
        send_interval: interval,
        ..PollerOptions::default()
    };
    WatermarkPoller::new(client, FileWatermarkStore::new(watermark_path), options)
}

fn watermark_file(dir: &TempDir) -> PathBuf {
    dir.path().join("last_check.txt")
}

async fn mock_accounts(
    server: &mut ServerGuard,
    accounts: serde_json::Value,
    hits: usize,
) -> Mock {
    server
        .mock("GET", "/api/v1/admin/accounts")
        .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(accounts.to_string())
        .expect(hits)
        .create_async()
        .await
}

async fn mock_welcome(
    server: &mut ServerGuard,
    username: &str,
    status: usize,
    hits: usize,
) -> Mock {
    server
        .mock("POST", "/api/v1/statuses")
        .match_header("authorization", format!("Bearer {}", TOKEN).as_str())
        .match_body(Matcher::Json(json!({
            "status": format!("@{} welcome!", username),
            "visibility": "direct"
        })))
        .with_status(status)
        .with_body(r#"{"id":"1"}"#)
        .expect(hits)
        .create_async()
        .await
}

fn hours_ago(hours: i64) -> String {
    (Utc::now() - chrono::Duration::hours(hours)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[tokio::test]
async fn test_absent_watermark_uses_last_24_hours() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let recent = hours_ago(1);

    let get = mock_accounts(
        &mut server,
        json!([
            {"id": "1", "username": "recent", "created_at": recent, "approved": true},
            {"id": "2", "username": "stale", "created_at": hours_ago(48), "approved": true}
        ]),
        1,
    )
    .await;
    let recent_post = mock_welcome(&mut server, "recent", 200, 1).await;
    let stale_post = mock_welcome(&mut server, "stale", 200, 0).await;

    let summary = poller(&server, &watermark_file(&dir)).run().await.unwrap();

    get.assert_async().await;
    recent_post.assert_async().await;
    stale_post.assert_async().await;
    assert_eq!(summary.notified, 1);
    assert_eq!(fs::read_to_string(watermark_file(&dir)).unwrap(), recent);
}

#[tokio::test]
async fn test_newer_account_advances_watermark() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(watermark_file(&dir), "2024-01-01T00:00:00.000Z").unwrap();

    let _get = mock_accounts(
        &mut server,
        json!([{"id": "9", "username": "alice", "created_at": "2024-01-02T00:00:00Z", "approved": true}]),
        1,
    )
    .await;
    let post = mock_welcome(&mut server, "alice", 200, 1).await;

    let summary = poller(&server, &watermark_file(&dir)).run().await.unwrap();

    post.assert_async().await;
    assert_eq!(summary.notified, 1);
    assert_eq!(summary.watermark.as_str(), "2024-01-02T00:00:00Z");
    assert_eq!(
        fs::read_to_string(watermark_file(&dir)).unwrap(),
        "2024-01-02T00:00:00Z"
    );
}

#[tokio::test]
async fn test_unparseable_and_unapproved_accounts_not_welcomed() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(watermark_file(&dir), "2024-01-01T00:00:00.000Z").unwrap();

    let _get = mock_accounts(
        &mut server,
        json!([
            {"id": "1", "username": "blank", "created_at": "", "approved": true},
            {"id": "2", "username": "pending", "created_at": "2024-01-03T00:00:00Z", "approved": false}
        ]),
        1,
    )
    .await;
    let any_post = server
        .mock("POST", "/api/v1/statuses")
        .expect(0)
        .create_async()
        .await;

    let summary = poller(&server, &watermark_file(&dir)).run().await.unwrap();

    any_post.assert_async().await;
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.notified, 0);
    assert_eq!(
        fs::read_to_string(watermark_file(&dir)).unwrap(),
        "2024-01-01T00:00:00.000Z"
    );
}

#[tokio::test]
async fn test_fetch_failure_leaves_watermark_untouched() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(watermark_file(&dir), "2024-01-01T00:00:00.000Z").unwrap();

    let _get = server
        .mock("GET", "/api/v1/admin/accounts")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;
    let any_post = server
        .mock("POST", "/api/v1/statuses")
        .expect(0)
        .create_async()
        .await;

    let err = poller(&server, &watermark_file(&dir)).run().await.unwrap_err();

    assert!(matches!(
        err,
        PollerError::Fetch(ApiError::Status { status: 500, .. })
    ));
    any_post.assert_async().await;
    assert_eq!(
        fs::read_to_string(watermark_file(&dir)).unwrap(),
        "2024-01-01T00:00:00.000Z"
    );
}

#[tokio::test]
async fn test_send_failure_stops_run_at_last_welcomed_account() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(watermark_file(&dir), "2024-01-01T00:00:00.000Z").unwrap();

    // Newest first, as the admin API returns them
    let _get = mock_accounts(
        &mut server,
        json!([
            {"id": "3", "username": "carol", "created_at": "2024-01-04T00:00:00Z", "approved": true},
            {"id": "2", "username": "bob", "created_at": "2024-01-03T00:00:00Z", "approved": true},
            {"id": "1", "username": "alice", "created_at": "2024-01-02T00:00:00Z", "approved": true}
        ]),
        1,
    )
    .await;
    let alice = mock_welcome(&mut server, "alice", 200, 1).await;
    let bob = mock_welcome(&mut server, "bob", 503, 1).await;
    let carol = mock_welcome(&mut server, "carol", 200, 0).await;

    let err = poller(&server, &watermark_file(&dir)).run().await.unwrap_err();

    match err {
        PollerError::Send { username, source, .. } => {
            assert_eq!(username, "bob");
            assert!(matches!(source, ApiError::Status { status: 503, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    alice.assert_async().await;
    bob.assert_async().await;
    carol.assert_async().await;
    assert_eq!(
        fs::read_to_string(watermark_file(&dir)).unwrap(),
        "2024-01-02T00:00:00Z"
    );
}

#[tokio::test]
async fn test_second_run_welcomes_nobody() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(watermark_file(&dir), "2024-01-01T00:00:00.000Z").unwrap();

    let get = mock_accounts(
        &mut server,
        json!([
            {"id": "2", "username": "bob", "created_at": "2024-01-03T00:00:00Z", "approved": true},
            {"id": "1", "username": "alice", "created_at": "2024-01-02T00:00:00Z", "approved": true}
        ]),
        2,
    )
    .await;
    let alice = mock_welcome(&mut server, "alice", 200, 1).await;
    let bob = mock_welcome(&mut server, "bob", 200, 1).await;

    let poller = poller(&server, &watermark_file(&dir));
    let first = poller.run().await.unwrap();
    let second = poller.run().await.unwrap();

    get.assert_async().await;
    alice.assert_async().await;
    bob.assert_async().await;
    assert_eq!(first.notified, 2);
    assert_eq!(second.notified, 0);
    assert_eq!(second.watermark.as_str(), "2024-01-03T00:00:00Z");
    assert!(second.watermark.at() >= first.watermark.at());
}

#[tokio::test]
async fn test_corrupt_watermark_aborts_before_fetch() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(watermark_file(&dir), "definitely not a timestamp").unwrap();

    let get = server
        .mock("GET", "/api/v1/admin/accounts")
        .expect(0)
        .create_async()
        .await;

    let err = poller(&server, &watermark_file(&dir)).run().await.unwrap_err();

    assert!(matches!(
        err,
        PollerError::Config(ConfigError::CorruptWatermark { .. })
    ));
    get.assert_async().await;
    assert_eq!(
        fs::read_to_string(watermark_file(&dir)).unwrap(),
        "definitely not a timestamp"
    );
}

#[tokio::test]
async fn test_sends_are_spaced_by_interval() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    fs::write(watermark_file(&dir), "2024-01-01T00:00:00.000Z").unwrap();

    let _get = mock_accounts(
        &mut server,
        json!([
            {"id": "1", "username": "alice", "created_at": "2024-01-02T00:00:00Z", "approved": true},
            {"id": "2", "username": "bob", "created_at": "2024-01-03T00:00:00Z", "approved": true},
            {"id": "3", "username": "carol", "created_at": "2024-01-04T00:00:00Z", "approved": true}
        ]),
        1,
    )
    .await;
    let _alice = mock_welcome(&mut server, "alice", 200, 1).await;
    let _bob = mock_welcome(&mut server, "bob", 200, 1).await;
    let _carol = mock_welcome(&mut server, "carol", 200, 1).await;

    let interval = Duration::from_millis(500);
    let poller = paced_poller(&server, &watermark_file(&dir), interval);
    let start = std::time::Instant::now();
    let summary = poller.run().await.unwrap();
    let elapsed = start.elapsed();

    // Two pauses for three sends; a third pause would reach 1.5s.
    assert_eq!(summary.notified, 3);
    assert!(elapsed >= interval * 2, "elapsed {elapsed:?}");
    assert!(elapsed < interval * 3, "elapsed {elapsed:?}");
}
