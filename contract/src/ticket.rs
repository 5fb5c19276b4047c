//! Ticket repository.

use crate::environment::{ContractEnvironment, Records};
use crate::error::{ContractError, Result};
use crate::request::decode_submitted;
use crate::types::{Ticket, TicketId, UserId};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::Span;

const ENTITY: &str = "ticket";

/// One committed write to a ticket key, as returned by
/// [`TicketRepository::history`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TicketRevision {
    /// Transaction that wrote the value
    #[serde(rename = "TxId")]
    pub tx_id: String,
    /// Stored ticket JSON, `null` for deletions or undecodable bytes
    #[serde(rename = "Value")]
    pub value: Value,
    /// Commit time
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Whether the write removed the ticket
    #[serde(rename = "IsDelete")]
    pub is_delete: bool,
}

/// Create, read, update and delete tickets.
#[derive(Clone)]
pub struct TicketRepository {
    records: Records,
    span: Span,
}

impl TicketRepository {
    /// Creates a repository over the environment's ledger
    #[must_use]
    pub fn new(env: &ContractEnvironment) -> Self {
        Self {
            records: env.records(),
            span: env.component_span("tickets"),
        }
    }

    /// Publish a ticket from its submitted JSON.
    ///
    /// # Errors
    ///
    /// - [`ContractError::CorruptedInput`]: a required field is missing or malformed
    /// - [`ContractError::AlreadyExists`]: the id is taken
    /// - [`ContractError::Ledger`]: a read or write failed
    #[tracing::instrument(parent = &self.span, skip_all)]
    pub async fn create(&self, raw: &str) -> Result<Ticket> {
        let ticket: Ticket = decode_submitted(ENTITY, raw, &Ticket::REQUIRED_FIELDS)?;
        if self.records.exists(ticket.ticket_id.as_str()).await? {
            return Err(ContractError::already_exists(ENTITY, ticket.ticket_id.as_str()));
        }

        self.records.put(ticket.ticket_id.as_str(), &ticket).await?;
        tracing::info!(ticket_id = %ticket.ticket_id, value = ticket.value, "Ticket created");
        Ok(ticket)
    }

    /// Fetch a ticket.
    ///
    /// # Errors
    ///
    /// - [`ContractError::NotFound`]: no ticket under `ticket_id`
    /// - [`ContractError::CorruptRecord`]: the stored bytes do not decode
    /// - [`ContractError::Ledger`]: the read failed
    pub async fn read(&self, ticket_id: &TicketId) -> Result<Ticket> {
        self.records
            .get(ENTITY, ticket_id.as_str())
            .await?
            .ok_or_else(|| ContractError::not_found(ENTITY, ticket_id.as_str()))
    }

    /// Overwrite an existing ticket on behalf of `actor`.
    ///
    /// Only the participant named as the submitted ticket's owner may write it.
    ///
    /// # Errors
    ///
    /// - [`ContractError::CorruptedInput`]: a required field is missing or malformed
    /// - [`ContractError::NotFound`]: the ticket does not exist
    /// - [`ContractError::NotAuthorized`]: `actor` is not the ticket owner
    /// - [`ContractError::Ledger`]: a read or write failed
    #[tracing::instrument(parent = &self.span, skip_all, fields(actor = %actor))]
    pub async fn update(&self, actor: &UserId, raw: &str) -> Result<Ticket> {
        let ticket: Ticket = decode_submitted(ENTITY, raw, &Ticket::REQUIRED_FIELDS)?;
        self.read(&ticket.ticket_id).await?;

        if ticket.user_id != *actor {
            tracing::warn!(ticket_id = %ticket.ticket_id, owner = %ticket.user_id, "Rejected ticket update");
            return Err(ContractError::NotAuthorized {
                entity: ENTITY,
                id: ticket.ticket_id.to_string(),
                actor: actor.to_string(),
            });
        }

        self.records.put(ticket.ticket_id.as_str(), &ticket).await?;
        tracing::info!(ticket_id = %ticket.ticket_id, "Ticket updated");
        Ok(ticket)
    }

    /// Remove a ticket. Orders against it are left untouched.
    ///
    /// # Errors
    ///
    /// - [`ContractError::NotFound`]: the ticket does not exist
    /// - [`ContractError::CorruptRecord`]: the key holds something other than a ticket
    /// - [`ContractError::Ledger`]: a read or write failed
    #[tracing::instrument(parent = &self.span, skip_all, fields(ticket_id = %ticket_id))]
    pub async fn delete(&self, ticket_id: &TicketId) -> Result<()> {
        self.read(ticket_id).await?;
        self.records.delete(ticket_id.as_str()).await?;
        tracing::info!("Ticket deleted");
        Ok(())
    }

    /// Every committed write to the ticket key, oldest first.
    ///
    /// A ticket that was never written has an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Ledger`] if the history cannot be read.
    pub async fn history(&self, ticket_id: &TicketId) -> Result<Vec<TicketRevision>> {
        let revisions: Vec<TicketRevision> = self
            .records
            .ledger()
            .history_for_key(ticket_id.as_str())
            .map_ok(|modification| TicketRevision {
                value: if modification.is_delete {
                    Value::Null
                } else {
                    serde_json::from_slice(&modification.value).unwrap_or(Value::Null)
                },
                tx_id: modification.tx_id,
                timestamp: modification.timestamp,
                is_delete: modification.is_delete,
            })
            .try_collect()
            .await?;
        tracing::debug!(parent: &self.span, ticket_id = %ticket_id, revisions = revisions.len(), "Ticket history read");
        Ok(revisions)
    }
}
