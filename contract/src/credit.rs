//! Credit ledger.
//!
//! One credit per participant, keyed by the configured prefix plus the user
//! id. A credit remembers every ticket it was paid for, which is what makes
//! [`CreditLedger::increment`] safe to repeat.

use crate::environment::{ContractEnvironment, Records};
use crate::error::{ContractError, Result};
use crate::types::{Credit, TicketId, UserId};
use serde::Serialize;
use tracing::Span;

const ENTITY: &str = "credit";

/// Result of crediting a ticket to a participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AwardOutcome {
    /// The ticket value was added
    Credited {
        /// Balance after the increment
        balance: u64,
    },
    /// The ticket had been credited before; nothing was written
    AlreadyCredited,
}

/// Create, read, increment and delete participant credits.
#[derive(Clone)]
pub struct CreditLedger {
    records: Records,
    prefix: String,
    span: Span,
}

impl CreditLedger {
    /// Creates a credit ledger over the environment's ledger
    #[must_use]
    pub fn new(env: &ContractEnvironment) -> Self {
        Self {
            records: env.records(),
            prefix: env.config.keys.credit_prefix.clone(),
            span: env.component_span("credits"),
        }
    }

    fn key(&self, user_id: &UserId) -> String {
        format!("{}{user_id}", self.prefix)
    }

    /// Open a credit with an initial balance.
    ///
    /// # Errors
    ///
    /// - [`ContractError::AlreadyExists`]: the participant already has a credit
    /// - [`ContractError::Ledger`]: a read or write failed
    #[tracing::instrument(parent = &self.span, skip_all, fields(user_id = %user_id))]
    pub async fn create(&self, user_id: &UserId, initial: u64) -> Result<Credit> {
        let key = self.key(user_id);
        if self.records.exists(&key).await? {
            return Err(ContractError::already_exists(ENTITY, user_id.as_str()));
        }

        let credit = Credit::new(user_id.clone(), initial);
        self.records.put(&key, &credit).await?;
        tracing::info!(balance = initial, "Credit created");
        Ok(credit)
    }

    /// Fetch a credit, if any.
    ///
    /// # Errors
    ///
    /// - [`ContractError::CorruptRecord`]: the stored bytes do not decode
    /// - [`ContractError::Ledger`]: the read failed
    pub async fn find(&self, user_id: &UserId) -> Result<Option<Credit>> {
        self.records.get(ENTITY, &self.key(user_id)).await
    }

    /// Fetch a credit.
    ///
    /// # Errors
    ///
    /// As [`CreditLedger::find`], plus [`ContractError::NotFound`] when the
    /// participant has no credit.
    pub async fn read(&self, user_id: &UserId) -> Result<Credit> {
        self.find(user_id)
            .await?
            .ok_or_else(|| ContractError::not_found(ENTITY, user_id.as_str()))
    }

    /// Add `amount` for `ticket_id`, once per ticket.
    ///
    /// # Errors
    ///
    /// - [`ContractError::NotFound`]: the participant has no credit
    /// - [`ContractError::Validation`]: the balance would overflow
    /// - [`ContractError::Ledger`]: a read or write failed
    #[tracing::instrument(parent = &self.span, skip_all, fields(user_id = %user_id, ticket_id = %ticket_id))]
    pub async fn increment(
        &self,
        user_id: &UserId,
        amount: u64,
        ticket_id: &TicketId,
    ) -> Result<(Credit, AwardOutcome)> {
        let credit = self.read(user_id).await?;
        self.apply_increment(credit, amount, ticket_id).await
    }

    /// Like [`CreditLedger::increment`], opening a zero-balance credit first
    /// when the participant has none.
    ///
    /// # Errors
    ///
    /// - [`ContractError::Validation`]: the balance would overflow
    /// - [`ContractError::Ledger`]: a read or write failed
    #[tracing::instrument(parent = &self.span, skip_all, fields(user_id = %user_id, ticket_id = %ticket_id))]
    pub async fn increment_or_open(
        &self,
        user_id: &UserId,
        amount: u64,
        ticket_id: &TicketId,
    ) -> Result<(Credit, AwardOutcome)> {
        let credit = match self.find(user_id).await? {
            Some(credit) => credit,
            None => {
                tracing::info!("Opening credit for award");
                Credit::new(user_id.clone(), 0)
            }
        };
        self.apply_increment(credit, amount, ticket_id).await
    }

    async fn apply_increment(
        &self,
        mut credit: Credit,
        amount: u64,
        ticket_id: &TicketId,
    ) -> Result<(Credit, AwardOutcome)> {
        if credit.has_ticket(ticket_id) {
            tracing::debug!("Ticket already credited");
            return Ok((credit, AwardOutcome::AlreadyCredited));
        }

        credit.value = credit.value.checked_add(amount).ok_or_else(|| {
            ContractError::validation(format!(
                "credit of {} would overflow adding {amount}",
                credit.user_id
            ))
        })?;
        credit.ticket_ids.push(ticket_id.clone());

        self.records.put(&self.key(&credit.user_id), &credit).await?;
        tracing::info!(amount, balance = credit.value, "Credit incremented");
        let balance = credit.value;
        Ok((credit, AwardOutcome::Credited { balance }))
    }

    /// Remove a credit.
    ///
    /// # Errors
    ///
    /// - [`ContractError::NotFound`]: the participant has no credit
    /// - [`ContractError::Ledger`]: a read or write failed
    #[tracing::instrument(parent = &self.span, skip_all, fields(user_id = %user_id))]
    pub async fn delete(&self, user_id: &UserId) -> Result<()> {
        let key = self.key(user_id);
        if !self.records.exists(&key).await? {
            return Err(ContractError::not_found(ENTITY, user_id.as_str()));
        }
        self.records.delete(&key).await?;
        tracing::info!("Credit deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use exchain_testing::InMemoryLedgerStore;
    use std::sync::Arc;

    fn ledger() -> (InMemoryLedgerStore, CreditLedger) {
        let store = InMemoryLedgerStore::new();
        let env = ContractEnvironment::new(Arc::new(store.clone()));
        (store, CreditLedger::new(&env))
    }

    #[tokio::test]
    async fn credits_are_keyed_by_prefix() {
        let (store, credits) = ledger();
        credits.create(&"alice".parse().unwrap(), 5).await.unwrap();
        assert!(store.contains_key("Credit_alice"));
    }

    #[tokio::test]
    async fn increment_is_idempotent_per_ticket() {
        let (store, credits) = ledger();
        let alice: UserId = "alice".parse().unwrap();
        let ticket: TicketId = "t1".parse().unwrap();
        credits.create(&alice, 10).await.unwrap();

        let (_, first) = credits.increment(&alice, 30, &ticket).await.unwrap();
        assert_eq!(first, AwardOutcome::Credited { balance: 40 });

        let writes = store.write_count();
        let (credit, second) = credits.increment(&alice, 30, &ticket).await.unwrap();
        assert_eq!(second, AwardOutcome::AlreadyCredited);
        assert_eq!(credit.value, 40);
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn increment_requires_a_credit() {
        let (_, credits) = ledger();
        let err = credits
            .increment(&"ghost".parse().unwrap(), 1, &"t1".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::NotFound { .. }));
    }

    #[tokio::test]
    async fn increment_or_open_starts_from_zero() {
        let (_, credits) = ledger();
        let bob: UserId = "bob".parse().unwrap();
        let (credit, outcome) = credits
            .increment_or_open(&bob, 30, &"t1".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(outcome, AwardOutcome::Credited { balance: 30 });
        assert_eq!(credit.ticket_ids.len(), 1);
        assert_eq!(credits.read(&bob).await.unwrap(), credit);
    }

    #[tokio::test]
    async fn overflow_is_rejected_without_writing() {
        let (_, credits) = ledger();
        let alice: UserId = "alice".parse().unwrap();
        credits.create(&alice, u64::MAX).await.unwrap();
        let err = credits
            .increment(&alice, 1, &"t1".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Validation(_)));
        assert!(credits.read(&alice).await.unwrap().ticket_ids.is_empty());
    }
}
