//! # Exchain Testing
//!
//! Testing utilities for the Exchain contract.
//!
//! This crate provides:
//! - [`InMemoryLedgerStore`]: a deterministic ledger with history, ordered
//!   prefix scans and write-failure injection
//! - [`FixedClock`] / [`test_clock`]: deterministic time
//! - [`init_tracing`]: opt-in log output for test runs
//!
//! ## Example
//!
//! ```ignore
//! use exchain::{Contract, ContractEnvironment};
//! use exchain_testing::InMemoryLedgerStore;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_ticket_flow() {
//!     let ledger = InMemoryLedgerStore::new();
//!     let env = ContractEnvironment::new(Arc::new(ledger.clone()));
//!     let contract = Contract::new(&env);
//!
//!     let response = contract.invoke("Init", Vec::new()).await;
//!     assert!(response.is_success());
//! }
//! ```

use chrono::{DateTime, Utc};
use exchain_core::environment::Clock;

pub mod ledger_mocks;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use exchain_testing::mocks::FixedClock;
    /// use exchain_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .map(|time| time.with_timezone(&Utc))
                .unwrap_or_default(),
        )
    }
}

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use ledger_mocks::InMemoryLedgerStore;
pub use mocks::{FixedClock, test_clock};
