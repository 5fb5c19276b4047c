//! Tests for the in-memory ledger used through the `LedgerStore` trait object

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use chrono::{TimeZone, Utc};
use exchain_core::key::CompositeKey;
use exchain_core::ledger::{KeyModification, LedgerEntry, LedgerStore};
use exchain_testing::{FixedClock, InMemoryLedgerStore};
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;

fn shared(ledger: &InMemoryLedgerStore) -> Arc<dyn LedgerStore> {
    Arc::new(ledger.clone())
}

#[tokio::test]
async fn test_clones_share_state() {
    let ledger = InMemoryLedgerStore::new();
    let store = shared(&ledger);

    store.put_state("alice", b"participant".to_vec()).await.unwrap();

    assert!(ledger.contains_key("alice"));
    assert_eq!(ledger.len(), 1);
}

#[tokio::test]
async fn test_history_is_stamped_by_injected_clock() {
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let ledger = InMemoryLedgerStore::with_clock(Arc::new(FixedClock::new(at)));
    let store = shared(&ledger);

    store.put_state("t1", b"v1".to_vec()).await.unwrap();

    let history: Vec<KeyModification> = store.history_for_key("t1").try_collect().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].timestamp, at);
    assert!(!history[0].is_delete);
}

#[tokio::test]
async fn test_history_stream_is_a_snapshot() {
    let ledger = InMemoryLedgerStore::new();
    let store = shared(&ledger);
    store.put_state("t1", b"v1".to_vec()).await.unwrap();

    let mut history = store.history_for_key("t1");
    let first = history.next().await.unwrap().unwrap();
    store.put_state("t1", b"v2".to_vec()).await.unwrap();

    assert_eq!(first.value, b"v1".to_vec());
    assert!(history.next().await.is_none());
}

#[tokio::test]
async fn test_namespace_prefix_sees_every_order() {
    let ledger = InMemoryLedgerStore::new();
    let store = shared(&ledger);

    for (ticket, user) in [("t1", "alice"), ("t2", "bob"), ("t1", "carol")] {
        let key = CompositeKey::new("Order", [ticket, user]).unwrap();
        store.put_state(&key.encode(), user.as_bytes().to_vec()).await.unwrap();
    }

    let everything = CompositeKey::new("Order", Vec::<String>::new()).unwrap();
    let entries: Vec<LedgerEntry> = store.scan_prefix(&everything).try_collect().await.unwrap();
    assert_eq!(entries.len(), 3);

    let t2 = CompositeKey::new("Order", ["t2"]).unwrap();
    let entries: Vec<LedgerEntry> = store.scan_prefix(&t2).try_collect().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].value, b"bob".to_vec());
}

#[tokio::test]
async fn test_failed_delete_keeps_record() {
    let ledger = InMemoryLedgerStore::new();
    let store = shared(&ledger);
    store.put_state("alice", b"x".to_vec()).await.unwrap();

    ledger.fail_writes_after(0);
    assert!(store.delete_state("alice").await.is_err());
    assert!(ledger.contains_key("alice"));
}
