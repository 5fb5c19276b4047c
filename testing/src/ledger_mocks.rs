//! In-memory ledger for tests and local demos
//!
//! [`InMemoryLedgerStore`] keeps current values in a `BTreeMap`, so prefix
//! scans come back in key order, and records every committed write in a
//! per-key history stamped by an injected [`Clock`].
//!
//! Writes can be made to fail after a budget of successful commits with
//! [`InMemoryLedgerStore::fail_writes_after`], which is how tests observe
//! partial effects of multi-key operations.

use exchain_core::environment::Clock;
use exchain_core::key::{CompositeKey, validate_simple_key};
use exchain_core::ledger::{
    KeyModification, LedgerEntry, LedgerError, LedgerFuture, LedgerStore, LedgerStream,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct LedgerInner {
    state: BTreeMap<String, Vec<u8>>,
    history: HashMap<String, Vec<KeyModification>>,
    next_tx: u64,
    write_budget: Option<usize>,
}

impl LedgerInner {
    fn consume_write_budget(&mut self, key: &str) -> Result<(), LedgerError> {
        match self.write_budget {
            Some(0) => Err(LedgerError::Backend(format!(
                "injected write failure for key {key:?}"
            ))),
            Some(ref mut remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn record(&mut self, key: &str, value: Vec<u8>, is_delete: bool, clock: &dyn Clock) {
        self.next_tx += 1;
        let modification = KeyModification {
            tx_id: format!("tx-{:06}", self.next_tx),
            value,
            is_delete,
            timestamp: clock.now(),
        };
        self.history
            .entry(key.to_string())
            .or_default()
            .push(modification);
    }
}

/// In-memory ledger store for fast, deterministic testing.
///
/// Cloning shares the underlying data, so a test can keep a handle for
/// inspection while the contract owns another.
///
/// # Example
///
/// ```
/// use exchain_core::ledger::LedgerStore;
/// use exchain_testing::InMemoryLedgerStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let ledger = InMemoryLedgerStore::new();
/// ledger.put_state("ticket-1", b"{}".to_vec()).await?;
/// assert_eq!(ledger.get_state("ticket-1").await?, Some(b"{}".to_vec()));
/// assert_eq!(ledger.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    inner: Arc<RwLock<LedgerInner>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl InMemoryLedgerStore {
    /// Create an empty ledger stamped by [`crate::test_clock`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(crate::test_clock()))
    }

    /// Create an empty ledger stamped by the given clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LedgerInner::default())),
            clock,
        }
    }

    /// Allow `successful` more writes (puts or deletes), then fail every
    /// following write with [`LedgerError::Backend`].
    pub fn fail_writes_after(&self, successful: usize) {
        if let Ok(mut inner) = self.inner.write() {
            inner.write_budget = Some(successful);
        }
    }

    /// Stop injecting write failures.
    pub fn heal(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.write_budget = None;
        }
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().map_or(0, |inner| inner.state.len())
    }

    /// Whether no key is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a key is live.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner
            .read()
            .is_ok_and(|inner| inner.state.contains_key(key))
    }

    /// All live keys, in key order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|inner| inner.state.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of committed writes, deletes included.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.inner.read().map_or(0, |inner| inner.next_tx)
    }

    fn get_now(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        validate_key(key)?;
        Ok(self.read()?.state.get(key).cloned())
    }

    fn put_now(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        validate_key(key)?;
        let mut inner = self.write()?;
        inner.consume_write_budget(key)?;
        inner.state.insert(key.to_string(), value.clone());
        inner.record(key, value, false, self.clock.as_ref());
        Ok(())
    }

    fn delete_now(&self, key: &str) -> Result<(), LedgerError> {
        validate_key(key)?;
        let mut inner = self.write()?;
        inner.consume_write_budget(key)?;
        if inner.state.remove(key).is_some() {
            inner.record(key, Vec::new(), true, self.clock.as_ref());
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerInner>, LedgerError> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Backend("ledger lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerInner>, LedgerError> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Backend("ledger lock poisoned".to_string()))
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_key(key: &str) -> Result<(), LedgerError> {
    if key.starts_with(exchain_core::key::DELIMITER) {
        CompositeKey::decode(key).map(|_| ())
    } else {
        validate_simple_key(key)
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn get_state<'a>(&'a self, key: &'a str) -> LedgerFuture<'a, Option<Vec<u8>>> {
        Box::pin(async move { self.get_now(key) })
    }

    fn put_state<'a>(&'a self, key: &'a str, value: Vec<u8>) -> LedgerFuture<'a, ()> {
        Box::pin(async move { self.put_now(key, value) })
    }

    fn delete_state<'a>(&'a self, key: &'a str) -> LedgerFuture<'a, ()> {
        Box::pin(async move { self.delete_now(key) })
    }

    fn history_for_key<'a>(&'a self, key: &'a str) -> LedgerStream<'a, KeyModification> {
        Box::pin(async_stream::stream! {
            if let Err(error) = validate_key(key) {
                yield Err(error);
                return;
            }
            // Snapshot at first poll; later writes are not observed.
            let snapshot = self
                .read()
                .map(|inner| inner.history.get(key).cloned().unwrap_or_default());
            match snapshot {
                Ok(modifications) => {
                    for modification in modifications {
                        yield Ok(modification);
                    }
                }
                Err(error) => yield Err(error),
            }
        })
    }

    fn scan_prefix<'a>(&'a self, prefix: &'a CompositeKey) -> LedgerStream<'a, LedgerEntry> {
        Box::pin(async_stream::stream! {
            let encoded = prefix.encode();
            let snapshot = self.read().map(|inner| {
                inner
                    .state
                    .range(encoded.clone()..)
                    .take_while(|(key, _)| key.starts_with(&encoded))
                    .map(|(key, value)| LedgerEntry {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect::<Vec<_>>()
            });
            match snapshot {
                Ok(entries) => {
                    for entry in entries {
                        yield Ok(entry);
                    }
                }
                Err(error) => yield Err(error),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn order_key(ticket: &str, user: &str) -> String {
        CompositeKey::new("Order", [ticket, user]).unwrap().encode()
    }

    #[tokio::test]
    async fn put_get_delete() {
        let ledger = InMemoryLedgerStore::new();
        assert_eq!(ledger.get_state("alice").await.unwrap(), None);

        ledger.put_state("alice", b"v1".to_vec()).await.unwrap();
        assert_eq!(ledger.get_state("alice").await.unwrap(), Some(b"v1".to_vec()));

        ledger.delete_state("alice").await.unwrap();
        assert_eq!(ledger.get_state("alice").await.unwrap(), None);
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn history_keeps_every_commit_in_order() {
        let ledger = InMemoryLedgerStore::new();
        ledger.put_state("t1", b"a".to_vec()).await.unwrap();
        ledger.put_state("t1", b"b".to_vec()).await.unwrap();
        ledger.delete_state("t1").await.unwrap();

        let history: Vec<KeyModification> =
            ledger.history_for_key("t1").try_collect().await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].value, b"a".to_vec());
        assert_eq!(history[1].value, b"b".to_vec());
        assert!(history[2].is_delete);
        assert!(history[0].tx_id < history[1].tx_id);
    }

    #[tokio::test]
    async fn deleting_absent_key_leaves_no_history() {
        let ledger = InMemoryLedgerStore::new();
        ledger.delete_state("ghost").await.unwrap();
        let history: Vec<KeyModification> =
            ledger.history_for_key("ghost").try_collect().await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn prefix_scan_is_scoped_and_ordered() {
        let ledger = InMemoryLedgerStore::new();
        ledger.put_state(&order_key("t1", "bob"), b"1".to_vec()).await.unwrap();
        ledger.put_state(&order_key("t1", "alice"), b"2".to_vec()).await.unwrap();
        ledger.put_state(&order_key("t10", "carol"), b"3".to_vec()).await.unwrap();
        ledger.put_state("t1", b"ticket".to_vec()).await.unwrap();

        let prefix = CompositeKey::new("Order", ["t1"]).unwrap();
        let entries: Vec<LedgerEntry> = ledger.scan_prefix(&prefix).try_collect().await.unwrap();

        let users: Vec<String> = entries
            .iter()
            .map(|e| CompositeKey::decode(&e.key).unwrap().components()[1].clone())
            .collect();
        assert_eq!(users, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn rejects_malformed_keys() {
        let ledger = InMemoryLedgerStore::new();
        let err = ledger.put_state("", Vec::new()).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidKey(_)));

        let err = ledger.get_state("\u{0}Order").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn injected_failures_keep_earlier_writes() {
        let ledger = InMemoryLedgerStore::new();
        ledger.fail_writes_after(1);

        ledger.put_state("a", b"1".to_vec()).await.unwrap();
        let err = ledger.put_state("b", b"2".to_vec()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Backend(_)));
        assert!(ledger.contains_key("a"));
        assert!(!ledger.contains_key("b"));

        ledger.heal();
        ledger.put_state("b", b"2".to_vec()).await.unwrap();
        assert_eq!(ledger.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ledger.write_count(), 2);
    }
}
