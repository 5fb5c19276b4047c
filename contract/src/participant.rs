//! Participant repository.
//!
//! Participants are stored under their own id. A single index record lists
//! every participant id so callers can enumerate them; create appends to it
//! and delete removes from it. The index is read-modify-written without a
//! lock, so two concurrent creates can lose an entry.

use crate::environment::{ContractEnvironment, Records};
use crate::error::{ContractError, Result};
use crate::request::decode_submitted;
use crate::types::{Participant, ParticipantIndex, UserId};
use tracing::Span;

const ENTITY: &str = "participant";

/// Create, read, update and delete participants.
#[derive(Clone)]
pub struct ParticipantRepository {
    records: Records,
    index_key: String,
    span: Span,
}

impl ParticipantRepository {
    /// Creates a repository over the environment's ledger
    #[must_use]
    pub fn new(env: &ContractEnvironment) -> Self {
        Self {
            records: env.records(),
            index_key: env.config.keys.participant_index.clone(),
            span: env.component_span("participants"),
        }
    }

    /// Reset the participant index to an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Ledger`] if the write fails.
    #[tracing::instrument(parent = &self.span, skip_all)]
    pub async fn init_index(&self) -> Result<()> {
        self.records
            .put(&self.index_key, &ParticipantIndex::default())
            .await?;
        tracing::info!(key = %self.index_key, "Participant index initialized");
        Ok(())
    }

    /// Register a participant from its submitted JSON.
    ///
    /// # Errors
    ///
    /// - [`ContractError::CorruptedInput`]: a required field is missing or malformed
    /// - [`ContractError::AlreadyExists`]: the id is taken
    /// - [`ContractError::Ledger`]: a read or write failed
    #[tracing::instrument(parent = &self.span, skip_all)]
    pub async fn create(&self, raw: &str) -> Result<Participant> {
        let participant: Participant =
            decode_submitted(ENTITY, raw, &Participant::REQUIRED_FIELDS)?;
        let key = participant.user_id.as_str();

        if self.records.exists(key).await? {
            return Err(ContractError::already_exists(ENTITY, key));
        }

        self.records.put(key, &participant).await?;

        let mut index = self.index().await?;
        if !index.insert(participant.user_id.clone()) {
            tracing::warn!(user_id = %participant.user_id, "Participant id was already indexed");
        }
        self.records.put(&self.index_key, &index).await?;

        tracing::info!(user_id = %participant.user_id, "Participant created");
        Ok(participant)
    }

    /// Fetch a participant.
    ///
    /// # Errors
    ///
    /// - [`ContractError::NotFound`]: no participant under `user_id`
    /// - [`ContractError::CorruptRecord`]: the stored bytes do not decode
    /// - [`ContractError::Ledger`]: the read failed
    pub async fn read(&self, user_id: &UserId) -> Result<Participant> {
        self.records
            .get(ENTITY, user_id.as_str())
            .await?
            .ok_or_else(|| ContractError::not_found(ENTITY, user_id.as_str()))
    }

    /// Overwrite an existing participant with its submitted JSON.
    ///
    /// # Errors
    ///
    /// - [`ContractError::CorruptedInput`]: a required field is missing or malformed
    /// - [`ContractError::NotFound`]: the participant does not exist
    /// - [`ContractError::Ledger`]: a read or write failed
    #[tracing::instrument(parent = &self.span, skip_all)]
    pub async fn update(&self, raw: &str) -> Result<Participant> {
        let participant: Participant =
            decode_submitted(ENTITY, raw, &Participant::REQUIRED_FIELDS)?;
        self.read(&participant.user_id).await?;

        self.records
            .put(participant.user_id.as_str(), &participant)
            .await?;
        tracing::info!(user_id = %participant.user_id, "Participant updated");
        Ok(participant)
    }

    /// Remove a participant and its index entry.
    ///
    /// The index is checked before anything is written, so a participant
    /// missing from the index is reported without touching the ledger.
    ///
    /// # Errors
    ///
    /// - [`ContractError::NotFound`]: the participant does not exist
    /// - [`ContractError::IndexInvariant`]: the participant is not indexed
    /// - [`ContractError::Ledger`]: a read or write failed
    #[tracing::instrument(parent = &self.span, skip_all, fields(user_id = %user_id))]
    pub async fn delete(&self, user_id: &UserId) -> Result<()> {
        self.read(user_id).await?;

        let mut index = self.index().await?;
        if !index.remove(user_id) {
            tracing::error!("Participant missing from index");
            return Err(ContractError::IndexInvariant(format!(
                "specified key {user_id} not found in index"
            )));
        }

        self.records.delete(user_id.as_str()).await?;
        self.records.put(&self.index_key, &index).await?;
        tracing::info!("Participant deleted");
        Ok(())
    }

    /// Current participant index.
    ///
    /// A ledger that was never initialized has an empty index.
    ///
    /// # Errors
    ///
    /// - [`ContractError::CorruptRecord`]: the index record does not decode
    /// - [`ContractError::Ledger`]: the read failed
    pub async fn index(&self) -> Result<ParticipantIndex> {
        let index = self.records.get(ENTITY, &self.index_key).await?;
        if index.is_none() {
            tracing::debug!(parent: &self.span, key = %self.index_key, "Participant index not initialized");
        }
        Ok(index.unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use exchain_testing::InMemoryLedgerStore;
    use std::sync::Arc;

    const ALICE: &str = r#"{"Participant_UserID":"alice","Participant_UserName":"Alice","Participant_Password":"pw","Participant_IsAdmin":false,"Participant_LoB":1}"#;

    fn repository() -> (InMemoryLedgerStore, ParticipantRepository) {
        let ledger = InMemoryLedgerStore::new();
        let env = ContractEnvironment::new(Arc::new(ledger.clone()));
        (ledger, ParticipantRepository::new(&env))
    }

    #[tokio::test]
    async fn create_indexes_exactly_once() {
        let (_, participants) = repository();
        participants.init_index().await.unwrap();
        participants.create(ALICE).await.unwrap();

        let index = participants.index().await.unwrap();
        assert_eq!(index.user_ids, vec!["alice".parse::<UserId>().unwrap()]);
    }

    #[tokio::test]
    async fn create_rejects_duplicate() {
        let (_, participants) = repository();
        participants.create(ALICE).await.unwrap();
        let err = participants.create(ALICE).await.unwrap_err();
        assert!(matches!(err, ContractError::AlreadyExists { .. }));
        assert_eq!(participants.index().await.unwrap().user_ids.len(), 1);
    }

    #[tokio::test]
    async fn delete_of_unindexed_participant_changes_nothing() {
        let (ledger, participants) = repository();
        participants.create(ALICE).await.unwrap();
        participants.init_index().await.unwrap();

        let alice: UserId = "alice".parse().unwrap();
        let err = participants.delete(&alice).await.unwrap_err();
        assert!(matches!(err, ContractError::IndexInvariant(_)));
        assert!(ledger.contains_key("alice"));
    }

    #[tokio::test]
    async fn update_requires_existing_participant() {
        let (_, participants) = repository();
        let err = participants.update(ALICE).await.unwrap_err();
        assert!(matches!(err, ContractError::NotFound { .. }));
    }
}
