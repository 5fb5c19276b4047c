//! Configuration for the contract.
//!
//! Loads the ledger key layout and log filter from environment variables with
//! defaults matching the layout existing ledgers were written with.

use serde::{Deserialize, Serialize};
use std::env;

/// Contract configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Ledger key layout
    pub keys: KeyConfig,
    /// Log filter (trace, debug, info, warn, error or an `EnvFilter` directive)
    pub log_level: String,
}

/// Where each record family lives in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Singleton key holding the participant index
    pub participant_index: String,
    /// Prefix prepended to a user id to form its credit key
    pub credit_prefix: String,
    /// Composite-key namespace of order records
    pub order_namespace: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            participant_index: "readingIDIndex".to_string(),
            credit_prefix: "Credit_".to_string(),
            order_namespace: "Order".to_string(),
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            keys: KeyConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ContractConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `EXCHAIN_INDEX_KEY` | `readingIDIndex` |
    /// | `EXCHAIN_CREDIT_PREFIX` | `Credit_` |
    /// | `EXCHAIN_ORDER_NAMESPACE` | `Order` |
    /// | `RUST_LOG` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            keys: KeyConfig {
                participant_index: env::var("EXCHAIN_INDEX_KEY")
                    .unwrap_or(defaults.keys.participant_index),
                credit_prefix: env::var("EXCHAIN_CREDIT_PREFIX")
                    .unwrap_or(defaults.keys.credit_prefix),
                order_namespace: env::var("EXCHAIN_ORDER_NAMESPACE")
                    .unwrap_or(defaults.keys.order_namespace),
            },
            log_level: env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}
