//! Version store behaviour under concurrency and across reopened databases.

use sitewatch_core::{Domain, StorageLayout};
use sitewatch_db::Database;
use sitewatch_scanner::{content_hash, SqliteVersionStore, StoreError, VersionStore};
use std::sync::Arc;
use tempfile::TempDir;

async fn file_store(tmp: &TempDir) -> SqliteVersionStore {
    let layout = StorageLayout::new(tmp.path());
    let db = Database::new(layout.database_path())
        .await
        .expect("open database");
    db.run_migrations().await.expect("run migrations");
    SqliteVersionStore::new(db, layout)
}

#[tokio::test]
async fn test_concurrent_writes_keep_sequences_contiguous() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(file_store(&tmp).await);
    let domain = Domain::new("example.com").unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        let domain = domain.clone();
        handles.push(tokio::spawn(async move {
            store
                .record_if_changed(&domain, format!("<html>revision {i}</html>").as_bytes())
                .await
        }));
    }

    let mut sequences = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(outcome.changed);
        sequences.push(outcome.record.sequence);
    }
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=8).collect::<Vec<i64>>());

    let history = store.history(&domain).await.unwrap();
    let stored: Vec<i64> = history.iter().map(|r| r.sequence).collect();
    assert_eq!(stored, (1..=8).collect::<Vec<i64>>());

    for record in &history {
        let path = store.layout().version_path(&domain, &record.file_name);
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content_hash(body.as_bytes()), record.content_hash);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_across_domains_all_succeed() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(file_store(&tmp).await);
    let domains: Vec<Domain> = (0..16)
        .map(|i| Domain::new(format!("site{i}.example")).unwrap())
        .collect();

    for round in 1..=5 {
        let mut handles = Vec::new();
        for domain in &domains {
            let store = Arc::clone(&store);
            let domain = domain.clone();
            handles.push(tokio::spawn(async move {
                let body = format!("<html>{domain} round {round}</html>");
                store.record_if_changed(&domain, body.as_bytes()).await
            }));
        }

        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert!(outcome.changed);
            assert_eq!(outcome.record.sequence, round);
        }
    }

    for domain in &domains {
        assert_eq!(store.history(domain).await.unwrap().len(), 5);
    }
}

#[tokio::test]
async fn test_concurrent_identical_content_is_stored_once() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(file_store(&tmp).await);
    let domain = Domain::new("example.com").unwrap();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let store = Arc::clone(&store);
        let domain = domain.clone();
        handles.push(tokio::spawn(async move {
            store.record_if_changed(&domain, b"<html>same</html>").await
        }));
    }

    let mut changed = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().changed {
            changed += 1;
        }
    }

    assert_eq!(changed, 1);
    assert_eq!(store.history(&domain).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_lineage_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let domain = Domain::new("example.com").unwrap();

    {
        let store = file_store(&tmp).await;
        store.record_if_changed(&domain, b"first").await.unwrap();
        store.record_if_changed(&domain, b"second").await.unwrap();
    }

    let store = file_store(&tmp).await;
    let unchanged = store.record_if_changed(&domain, b"second").await.unwrap();
    assert!(!unchanged.changed);
    assert_eq!(unchanged.record.sequence, 2);

    let third = store.record_if_changed(&domain, b"third").await.unwrap();
    assert_eq!(third.record.sequence, 3);
    assert_eq!(third.record.file_name, "v000003.html");
}

#[tokio::test]
async fn test_failed_file_write_leaves_no_row() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("blocked");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let db = Database::in_memory().await.unwrap();
    db.run_migrations().await.unwrap();
    let store = SqliteVersionStore::new(db, StorageLayout::new(&blocker));
    let domain = Domain::new("example.com").unwrap();

    let err = store
        .record_if_changed(&domain, b"<html></html>")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(store.latest(&domain).await.unwrap().is_none());
    assert!(store.history(&domain).await.unwrap().is_empty());
}
