//! Error type for contract operations.
//!
//! Every failure reaching the dispatcher becomes a `Response::Error` carrying
//! the `Display` text of one of these variants. Skipped entries of a bulk
//! transition are not errors and never appear here.

use exchain_core::ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur in contract operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Caller input is malformed (argument count, numbers, request shape).
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A submitted record is missing required fields or does not decode.
    #[error("{entity} input is corrupted: {reason}")]
    CorruptedInput {
        /// Entity kind being decoded
        entity: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// No record is stored under the key.
    #[error("{entity} {id} does not exist")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Requested identifier
        id: String,
    },

    /// A record is already stored under the key.
    #[error("{entity} {id} already exists")]
    AlreadyExists {
        /// Entity kind
        entity: &'static str,
        /// Conflicting identifier
        id: String,
    },

    /// The acting participant may not perform the change.
    #[error("{actor} has no rights to update {entity} {id}")]
    NotAuthorized {
        /// Entity kind
        entity: &'static str,
        /// Target identifier
        id: String,
        /// Acting participant
        actor: String,
    },

    /// The participant index disagrees with the stored participants.
    #[error("Participant index invariant violated: {0}")]
    IndexInvariant(String),

    /// A stored record does not decode into its entity shape.
    #[error("Corrupt {entity} record under {key:?}: {reason}")]
    CorruptRecord {
        /// Entity kind
        entity: &'static str,
        /// Ledger key
        key: String,
        /// Decoder message
        reason: String,
    },

    /// The ledger rejected or failed an operation.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A record could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ContractError {
    /// Shorthand for [`ContractError::Validation`]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for [`ContractError::NotFound`]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for [`ContractError::AlreadyExists`]
    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.into(),
        }
    }
}

/// Result type for contract operations.
pub type Result<T> = std::result::Result<T, ContractError>;
