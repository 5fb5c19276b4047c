//! Ledger store trait and related types.
//!
//! The ledger is an external, append-only keyed store. It offers single-key
//! reads and writes, the committed history of a key, and range scans over
//! composite-key prefixes. It serializes concurrent writers and makes every
//! successful write durable; it offers no rollback, no uniqueness
//! constraints and no multi-key transactions.
//!
//! # Implementations
//!
//! - `InMemoryLedgerStore` (in `exchain-testing`): `BTreeMap`-backed double
//!   for tests and the demo binary
//!
//! # Example
//!
//! ```no_run
//! use exchain_core::key::CompositeKey;
//! use exchain_core::ledger::{LedgerError, LedgerStore};
//! use futures::TryStreamExt;
//!
//! async fn example<L: LedgerStore>(ledger: &L) -> Result<(), LedgerError> {
//!     ledger.put_state("alice", br#"{"name":"Alice"}"#.to_vec()).await?;
//!     let bytes = ledger.get_state("alice").await?;
//!     assert!(bytes.is_some());
//!
//!     let prefix = CompositeKey::new("Order", ["ticket-1"])?;
//!     let orders: Vec<_> = ledger.scan_prefix(&prefix).try_collect().await?;
//!     println!("{} orders", orders.len());
//!     Ok(())
//! }
//! ```

use crate::key::CompositeKey;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The key (simple or composite) is malformed.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The backing store failed to read or commit.
    #[error("Ledger backend error: {0}")]
    Backend(String),

    /// A value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Future returned by every single-shot ledger operation.
pub type LedgerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LedgerError>> + Send + 'a>>;

/// Lazy, forward-only result sequence returned by history and range scans.
///
/// A stream is consumed once; to iterate again, ask the ledger for a new one.
pub type LedgerStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T, LedgerError>> + Send + 'a>>;

/// A key and its current value, as yielded by a prefix scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Full encoded key.
    pub key: String,
    /// Stored bytes.
    pub value: Vec<u8>,
}

/// One committed modification of a key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyModification {
    /// Identifier of the write that produced this modification.
    pub tx_id: String,
    /// Value written; empty when `is_delete` is set.
    pub value: Vec<u8>,
    /// Whether this modification removed the key.
    pub is_delete: bool,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
}

/// Keyed ledger storage.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; components share one store through
/// `Arc<dyn LedgerStore>`.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures and streams instead of using `async fn` so the
/// trait can be used as a trait object.
pub trait LedgerStore: Send + Sync {
    /// Read the current value of a key.
    ///
    /// Returns `None` when the key was never written or has been deleted.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: the key is malformed
    /// - `Backend`: the store could not be read
    fn get_state<'a>(&'a self, key: &'a str) -> LedgerFuture<'a, Option<Vec<u8>>>;

    /// Write a value under a key, replacing any current value.
    ///
    /// The write is durable once the future resolves successfully.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: the key is malformed
    /// - `Backend`: the write was not committed
    fn put_state<'a>(&'a self, key: &'a str, value: Vec<u8>) -> LedgerFuture<'a, ()>;

    /// Remove a key. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// - `InvalidKey`: the key is malformed
    /// - `Backend`: the delete was not committed
    fn delete_state<'a>(&'a self, key: &'a str) -> LedgerFuture<'a, ()>;

    /// Committed modifications of a key, oldest first.
    ///
    /// Errors are reported as stream items.
    fn history_for_key<'a>(&'a self, key: &'a str) -> LedgerStream<'a, KeyModification>;

    /// Every entry whose key starts with the encoded `prefix`, in key order.
    ///
    /// Errors are reported as stream items.
    fn scan_prefix<'a>(&'a self, prefix: &'a CompositeKey) -> LedgerStream<'a, LedgerEntry>;
}
