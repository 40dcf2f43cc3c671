//! Engine orchestration contract tests
//!
//! Drives the engine with a synthetic discovery stream and verifies
//! the accept → persist → dispatch pipeline end to end against the
//! fake record store and a real temp log file.

mod common;

use std::sync::Arc;
use std::time::Duration;

use cfsync_core::cache::CacheLog;
use cfsync_core::classify::Family;
use cfsync_core::engine::{EngineEvent, SyncEngine};
use common::FakeRecordStore;

/// Give fire-and-forget reconciliation tasks time to land
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

fn engine_with(
    store: &FakeRecordStore,
    log_path: &std::path::Path,
    records: &[&str],
    sync_count: usize,
) -> (SyncEngine, tokio::sync::mpsc::Receiver<EngineEvent>) {
    SyncEngine::new(
        Arc::new(store.clone()),
        CacheLog::new(log_path),
        records.iter().map(|s| s.to_string()).collect(),
        sync_count,
    )
}

#[tokio::test]
async fn accepted_address_is_persisted_and_synced_per_record_name() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("cfnat_log.txt");
    let store = FakeRecordStore::new();
    let (engine, _events) = engine_with(
        &store,
        &log_path,
        &["fast.example.com", "edge.example.com"],
        1,
    );

    let lines = tokio_stream::iter(vec![
        "scanning 1.2.3.4:443".to_string(),
        "发现最佳地址: 203.0.113.5".to_string(),
    ]);
    engine.run(lines).await.unwrap();
    settle().await;

    // Persisted.
    let content = tokio::fs::read_to_string(&log_path).await.unwrap();
    assert!(content.ends_with("203.0.113.5\n"));
    assert_eq!(content.lines().count(), 1);

    // One reconciliation per configured record name.
    for name in ["fast.example.com", "edge.example.com"] {
        let records: Vec<String> = store
            .records_for(name, Family::A)
            .into_iter()
            .map(|r| r.content)
            .collect();
        assert_eq!(records, vec!["203.0.113.5".to_string()], "record {}", name);
    }
}

#[tokio::test]
async fn duplicate_address_is_accepted_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = FakeRecordStore::new();
    let (engine, mut events) = engine_with(
        &store,
        &dir.path().join("cfnat_log.txt"),
        &["fast.example.com"],
        4,
    );

    let lines = tokio_stream::iter(vec![
        "best: 203.0.113.5".to_string(),
        "best: 203.0.113.5".to_string(),
    ]);
    engine.run(lines).await.unwrap();
    settle().await;

    let mut accepted = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, EngineEvent::AddressAccepted { .. }) {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1, "second sighting of the same address is a no-op");
}

#[tokio::test]
async fn non_candidate_lines_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("cfnat_log.txt");
    let store = FakeRecordStore::new();
    let (engine, _events) = engine_with(&store, &log_path, &["fast.example.com"], 1);

    let lines = tokio_stream::iter(vec![
        "connected to 203.0.113.5:443".to_string(),
        "latency 1.2.3.4 looks fine".to_string(),
    ]);
    engine.run(lines).await.unwrap();
    settle().await;

    assert_eq!(store.mutation_count(), 0);
    assert!(!log_path.exists(), "no acceptance, no log file");
}

#[tokio::test]
async fn newer_address_evicts_older_with_sync_count_one() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("cfnat_log.txt");
    let store = FakeRecordStore::new();
    let (engine, _events) = engine_with(&store, &log_path, &["fast.example.com"], 1);

    let lines = tokio_stream::iter(vec![
        "best: 203.0.113.5".to_string(),
        "best: 203.0.113.9".to_string(),
    ]);
    engine.run(lines).await.unwrap();
    settle().await;

    // Log holds exactly the evicted-to state.
    let content = tokio::fs::read_to_string(&log_path).await.unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("203.0.113.9"));

    // Remote converged to the surviving address.
    let records: Vec<String> = store
        .records_for("fast.example.com", Family::A)
        .into_iter()
        .map(|r| r.content)
        .collect();
    assert_eq!(records, vec!["203.0.113.9".to_string()]);
}

#[tokio::test]
async fn seed_from_log_restores_prior_state() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("cfnat_log.txt");
    tokio::fs::write(
        &log_path,
        "2025-06-01 12:00:01 203.0.113.5\n2025-06-01 12:00:02 203.0.113.9\n",
    )
    .await
    .unwrap();

    let store = FakeRecordStore::new();
    let (engine, _events) = engine_with(&store, &log_path, &["fast.example.com"], 1);

    let replayed = engine.seed_from_log().await.unwrap();
    assert_eq!(replayed, 2);

    // sync_count=1 keeps the oldest-timestamp survivor.
    let desired = engine.cache().read().await.desired(Family::A);
    assert_eq!(desired.len(), 1);
    assert_eq!(desired[0].to_string(), "203.0.113.5");
}

#[tokio::test]
async fn duplicate_log_lines_seed_a_single_entry() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("cfnat_log.txt");
    tokio::fs::write(
        &log_path,
        "2025-06-01 12:00:01 203.0.113.5\n2025-06-01 12:00:02 203.0.113.5\n",
    )
    .await
    .unwrap();

    let store = FakeRecordStore::new();
    let (engine, _events) = engine_with(&store, &log_path, &["fast.example.com"], 2);

    let replayed = engine.seed_from_log().await.unwrap();
    assert_eq!(replayed, 2);

    // Both lines replay but the address enters the cache once.
    let desired = engine.cache().read().await.desired(Family::A);
    assert_eq!(desired.len(), 1);
    assert_eq!(desired[0].to_string(), "203.0.113.5");
}

#[tokio::test]
async fn cache_save_failure_is_reported_and_cache_stays_authoritative() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("cfnat_log.txt");
    // Occupy the log path with a directory so every save fails.
    tokio::fs::create_dir(&log_path).await.unwrap();

    let store = FakeRecordStore::new();
    let (engine, mut events) = engine_with(&store, &log_path, &["fast.example.com"], 1);

    let lines = tokio_stream::iter(vec!["best: 203.0.113.5".to_string()]);
    engine.run(lines).await.unwrap();
    settle().await;

    let mut save_failed = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, EngineEvent::CacheSaveFailed { .. }) {
            save_failed = true;
        }
    }
    assert!(save_failed, "failed persist must be reported");

    // The in-memory cache is untouched by the failed save and
    // reconciliation still went through.
    let desired = engine.cache().read().await.desired(Family::A);
    assert_eq!(desired.len(), 1);
    assert_eq!(desired[0].to_string(), "203.0.113.5");

    let records: Vec<String> = store
        .records_for("fast.example.com", Family::A)
        .into_iter()
        .map(|r| r.content)
        .collect();
    assert_eq!(records, vec!["203.0.113.5".to_string()]);
}

#[tokio::test]
async fn seeded_address_is_not_reaccepted() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("cfnat_log.txt");
    tokio::fs::write(&log_path, "2025-06-01 12:00:01 203.0.113.5\n")
        .await
        .unwrap();

    let store = FakeRecordStore::new();
    let (engine, mut events) = engine_with(&store, &log_path, &["fast.example.com"], 1);
    engine.seed_from_log().await.unwrap();

    let lines = tokio_stream::iter(vec!["best: 203.0.113.5".to_string()]);
    engine.run(lines).await.unwrap();
    settle().await;

    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, EngineEvent::AddressAccepted { .. }),
            "replayed address must not be re-accepted"
        );
    }
}
