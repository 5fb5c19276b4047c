//! Injected dependencies shared by every contract component.

use crate::config::ContractConfig;
use crate::error::{ContractError, Result};
use exchain_core::ledger::LedgerStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::Span;

/// Environment dependencies for the contract.
///
/// Logging is injected as a parent span: every component opens its own child
/// span under `span`, so a host embedding several contracts can tell their
/// output apart without a process-wide logger.
#[derive(Clone)]
pub struct ContractEnvironment {
    /// Ledger all records live in
    pub ledger: Arc<dyn LedgerStore>,
    /// Key layout and log settings
    pub config: ContractConfig,
    /// Parent span for all component logging
    pub span: Span,
}

impl ContractEnvironment {
    /// Creates an environment with default configuration and an `exchain` span
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger,
            config: ContractConfig::default(),
            span: tracing::info_span!("exchain"),
        }
    }

    /// Replaces the configuration
    #[must_use]
    pub fn with_config(mut self, config: ContractConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the parent span
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub(crate) fn component_span(&self, component: &'static str) -> Span {
        tracing::info_span!(parent: &self.span, "component", name = component)
    }

    pub(crate) fn records(&self) -> Records {
        Records {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl std::fmt::Debug for ContractEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractEnvironment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// JSON codec over the ledger.
///
/// Writes that fail surface as [`ContractError::Ledger`]; callers abort the
/// operation on the first one.
#[derive(Clone)]
pub(crate) struct Records {
    ledger: Arc<dyn LedgerStore>,
}

impl Records {
    pub(crate) fn ledger(&self) -> &dyn LedgerStore {
        self.ledger.as_ref()
    }

    pub(crate) async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.ledger.get_state(key).await?)
    }

    pub(crate) async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get_raw(key).await?.is_some())
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        entity: &'static str,
        key: &str,
    ) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(bytes) => decode(entity, key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    pub(crate) async fn put<T: Serialize + Sync>(&self, key: &str, record: &T) -> Result<()> {
        let bytes =
            serde_json::to_vec(record).map_err(|e| ContractError::Serialization(e.to_string()))?;
        Ok(self.ledger.put_state(key, bytes).await?)
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<()> {
        Ok(self.ledger.delete_state(key).await?)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(entity: &'static str, key: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| ContractError::CorruptRecord {
        entity,
        key: key.to_string(),
        reason: e.to_string(),
    })
}
