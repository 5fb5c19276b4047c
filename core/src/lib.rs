//! # Exchain Core
//!
//! Storage abstractions the Exchain contract is written against.
//!
//! The contract never talks to a concrete ledger. It receives an
//! `Arc<dyn LedgerStore>` and builds everything (natural-key records, the
//! participant index, composite-keyed orders) on the five primitives that
//! trait exposes.
//!
//! ## Modules
//!
//! - [`ledger`]: the [`LedgerStore`](ledger::LedgerStore) trait, its error
//!   type and the records yielded by history and prefix scans
//! - [`key`]: [`CompositeKey`](key::CompositeKey) encoding and simple-key rules
//! - [`environment`]: the [`Clock`](environment::Clock) trait

pub mod environment;
pub mod key;
pub mod ledger;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use environment::{Clock, SystemClock};
pub use key::CompositeKey;
pub use ledger::{KeyModification, LedgerEntry, LedgerError, LedgerFuture, LedgerStore, LedgerStream};
