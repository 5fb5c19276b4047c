//! Order Lifecycle Manager.
//!
//! An order records one participant's claim against one ticket and lives
//! under the composite key `Order` + `[ticket, user]`, so every order of a
//! ticket can be found with a prefix scan.
//!
//! Orders move forward one step at a time:
//!
//! ```text
//! Applied(0) ──► Confirmed(2) ──► Done(3) ──► Awarded(4)
//!     ▲                                          │
//!     └──────────────── close ◄──────────────────┘
//! ```
//!
//! Closing resets any order, present or not, to `Applied`. A forward step is
//! written only for users whose order currently holds the target's
//! predecessor; everyone else is skipped and the skip is reported, not
//! raised. Moving to `Awarded` is followed by the award pass, which credits
//! the ticket value to each listed user at most once.
//!
//! Steps run one after another with plain read-modify-write. A ledger failure
//! aborts the call and leaves every earlier write in place.

use crate::credit::{AwardOutcome, CreditLedger};
use crate::environment::{ContractEnvironment, Records, decode};
use crate::error::{ContractError, Result};
use crate::request::OrderUpdate;
use crate::ticket::TicketRepository;
use crate::types::{Order, OrderStatus, TicketId, UserId};
use exchain_core::key::CompositeKey;
use futures::TryStreamExt;
use serde::Serialize;
use tracing::Span;

const ENTITY: &str = "order";

/// Why a user was left out of a bulk transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The user has no order for the ticket
    NoOrder,
    /// The order is not at the target's predecessor
    OutOfSequence {
        /// Status the order holds
        current: OrderStatus,
    },
}

/// What a bulk transition did for one user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The order was written with the target status
    Written {
        /// Status before the write, `None` if no readable order was stored
        previous: Option<OrderStatus>,
    },
    /// Nothing was written
    Skipped {
        /// Why
        #[serde(flatten)]
        reason: SkipReason,
    },
}

impl TransitionOutcome {
    /// Whether the order was written
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Per-user transition result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionEntry {
    /// User the entry is about
    pub user_id: UserId,
    /// What happened
    #[serde(flatten)]
    pub outcome: TransitionOutcome,
}

/// Per-user award result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AwardEntry {
    /// User the entry is about
    pub user_id: UserId,
    /// What happened to their credit
    #[serde(flatten)]
    pub outcome: AwardOutcome,
}

/// Result of a bulk transition, one entry per listed user in input order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionReport {
    /// Ticket whose orders moved
    pub ticket_id: TicketId,
    /// Status the orders were moved to
    pub target: OrderStatus,
    /// Order outcomes
    pub entries: Vec<TransitionEntry>,
    /// Credit outcomes; empty unless `target` is `Awarded`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub awards: Vec<AwardEntry>,
}

impl TransitionReport {
    /// Users whose orders were written
    pub fn written(&self) -> impl Iterator<Item = &UserId> {
        self.entries
            .iter()
            .filter(|entry| entry.outcome.is_written())
            .map(|entry| &entry.user_id)
    }

    /// Users that were skipped, with the reason
    pub fn skipped(&self) -> impl Iterator<Item = (&UserId, SkipReason)> {
        self.entries.iter().filter_map(|entry| match entry.outcome {
            TransitionOutcome::Skipped { reason } => Some((&entry.user_id, reason)),
            TransitionOutcome::Written { .. } => None,
        })
    }
}

/// Result of an [`OrderUpdate`]: the close pass, then the advance pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// Ticket whose orders changed
    pub ticket_id: TicketId,
    /// Close pass, if requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<TransitionReport>,
    /// Advance pass, if requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advance: Option<TransitionReport>,
}

/// Enumeration element, `{"Record": <order>}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderRecord {
    /// The stored order
    #[serde(rename = "Record")]
    pub record: Order,
}

/// Decide what a transition to `target` does to an order in state `current`.
#[must_use]
pub fn decide(current: Option<OrderStatus>, target: OrderStatus) -> TransitionOutcome {
    match (target.predecessor(), current) {
        (None, previous) => TransitionOutcome::Written { previous },
        (Some(_), None) => TransitionOutcome::Skipped {
            reason: SkipReason::NoOrder,
        },
        (Some(required), Some(current)) if current == required => TransitionOutcome::Written {
            previous: Some(current),
        },
        (Some(_), Some(current)) => TransitionOutcome::Skipped {
            reason: SkipReason::OutOfSequence { current },
        },
    }
}

/// Applies, reads, enumerates and transitions orders.
#[derive(Clone)]
pub struct OrderLifecycle {
    records: Records,
    namespace: String,
    tickets: TicketRepository,
    credits: CreditLedger,
    span: Span,
}

impl OrderLifecycle {
    /// Creates the lifecycle manager over the environment's ledger
    #[must_use]
    pub fn new(env: &ContractEnvironment) -> Self {
        Self {
            records: env.records(),
            namespace: env.config.keys.order_namespace.clone(),
            tickets: TicketRepository::new(env),
            credits: CreditLedger::new(env),
            span: env.component_span("orders"),
        }
    }

    fn key(&self, ticket_id: &TicketId, user_id: &UserId) -> Result<CompositeKey> {
        Ok(CompositeKey::new(
            &self.namespace,
            [ticket_id.as_str(), user_id.as_str()],
        )?)
    }

    fn ticket_prefix(&self, ticket_id: &TicketId) -> Result<CompositeKey> {
        Ok(CompositeKey::new(&self.namespace, [ticket_id.as_str()])?)
    }

    /// Fetch an order, if any.
    ///
    /// # Errors
    ///
    /// - [`ContractError::CorruptRecord`]: the stored bytes do not decode
    /// - [`ContractError::Ledger`]: the key is invalid or the read failed
    pub async fn find(&self, ticket_id: &TicketId, user_id: &UserId) -> Result<Option<Order>> {
        let key = self.key(ticket_id, user_id)?;
        self.records.get(ENTITY, &key.encode()).await
    }

    /// Fetch an order.
    ///
    /// # Errors
    ///
    /// As [`OrderLifecycle::find`], plus [`ContractError::NotFound`] when the
    /// user has no order for the ticket.
    pub async fn read(&self, ticket_id: &TicketId, user_id: &UserId) -> Result<Order> {
        self.find(ticket_id, user_id).await?.ok_or_else(|| {
            ContractError::not_found(ENTITY, format!("({ticket_id}, {user_id})"))
        })
    }

    /// Apply `user_id` for `ticket_id`, resetting any existing order to
    /// `Applied`. The ticket itself is not looked up.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Ledger`] if the write fails.
    pub async fn apply(&self, ticket_id: &TicketId, user_id: &UserId) -> Result<Order> {
        self.transition(ticket_id, std::slice::from_ref(user_id), OrderStatus::Applied)
            .await?;
        Ok(Order::new(
            ticket_id.clone(),
            user_id.clone(),
            OrderStatus::Applied,
        ))
    }

    /// Every order of `ticket_id`, in ledger key order.
    ///
    /// # Errors
    ///
    /// - [`ContractError::CorruptRecord`]: a stored order does not decode
    /// - [`ContractError::Ledger`]: the scan failed
    pub async fn orders_for_ticket(&self, ticket_id: &TicketId) -> Result<Vec<Order>> {
        let prefix = self.ticket_prefix(ticket_id)?;
        let entries: Vec<_> = self
            .records
            .ledger()
            .scan_prefix(&prefix)
            .try_collect()
            .await?;

        let orders = entries
            .iter()
            .map(|entry| decode(ENTITY, &entry.key, &entry.value))
            .collect::<Result<Vec<Order>>>()?;
        tracing::debug!(parent: &self.span, ticket_id = %ticket_id, count = orders.len(), "Orders enumerated");
        Ok(orders)
    }

    /// Every order of `ticket_id` wrapped as `[{"Record": <order>}, ...]`.
    ///
    /// # Errors
    ///
    /// As [`OrderLifecycle::orders_for_ticket`], plus
    /// [`ContractError::Serialization`] if the array cannot be encoded.
    pub async fn enumerate_json(&self, ticket_id: &TicketId) -> Result<Vec<u8>> {
        let records: Vec<OrderRecord> = self
            .orders_for_ticket(ticket_id)
            .await?
            .into_iter()
            .map(|record| OrderRecord { record })
            .collect();
        serde_json::to_vec(&records).map_err(|e| ContractError::Serialization(e.to_string()))
    }

    /// Move the orders of `users` on `ticket_id` to `target`.
    ///
    /// Users are processed in input order; a repeated user is processed again.
    /// When `target` is [`OrderStatus::Awarded`] the award pass runs after all
    /// order writes, for every listed user whether or not their order moved.
    ///
    /// # Errors
    ///
    /// - [`ContractError::NotFound`]: the award pass could not find the ticket
    /// - [`ContractError::Validation`]: an award would overflow a credit
    /// - [`ContractError::CorruptRecord`]: a stored order or credit does not decode
    /// - [`ContractError::Ledger`]: a read or write failed
    ///
    /// Writes made before the failure are kept.
    #[tracing::instrument(
        parent = &self.span,
        skip_all,
        fields(ticket_id = %ticket_id, target = %target, users = users.len())
    )]
    pub async fn transition(
        &self,
        ticket_id: &TicketId,
        users: &[UserId],
        target: OrderStatus,
    ) -> Result<TransitionReport> {
        let mut entries = Vec::with_capacity(users.len());

        for user_id in users {
            let key = self.key(ticket_id, user_id)?.encode();
            let current = match self.records.get::<Order>(ENTITY, &key).await {
                Ok(order) => order.map(|order| order.status),
                // Close overwrites whatever is stored, readable or not.
                Err(e @ ContractError::CorruptRecord { .. }) if target == OrderStatus::Applied => {
                    tracing::warn!(user_id = %user_id, error = %e, "Closing unreadable order");
                    None
                }
                Err(e) => return Err(e),
            };

            let outcome = decide(current, target);
            match outcome {
                TransitionOutcome::Written { .. } => {
                    let order = Order::new(ticket_id.clone(), user_id.clone(), target);
                    self.records.put(&key, &order).await?;
                    tracing::debug!(user_id = %user_id, "Order written");
                }
                TransitionOutcome::Skipped { reason } => {
                    tracing::info!(user_id = %user_id, ?reason, "Order skipped");
                }
            }
            entries.push(TransitionEntry {
                user_id: user_id.clone(),
                outcome,
            });
        }

        let awards = if target == OrderStatus::Awarded {
            self.award(ticket_id, users).await?
        } else {
            Vec::new()
        };

        let report = TransitionReport {
            ticket_id: ticket_id.clone(),
            target,
            entries,
            awards,
        };
        tracing::info!(
            written = report.written().count(),
            skipped = report.skipped().count(),
            "Transition complete"
        );
        Ok(report)
    }

    async fn award(&self, ticket_id: &TicketId, users: &[UserId]) -> Result<Vec<AwardEntry>> {
        let ticket = self.tickets.read(ticket_id).await.inspect_err(|e| {
            tracing::error!(error = %e, "Award pass aborted");
        })?;

        let mut awards = Vec::with_capacity(users.len());
        for user_id in users {
            let (_, outcome) = self
                .credits
                .increment_or_open(user_id, ticket.value, ticket_id)
                .await?;
            awards.push(AwardEntry {
                user_id: user_id.clone(),
                outcome,
            });
        }
        Ok(awards)
    }

    /// Run a bulk update: the close pass first, then the advance pass.
    ///
    /// # Errors
    ///
    /// As [`OrderLifecycle::transition`]. A failing close pass stops the
    /// update before the advance pass starts.
    pub async fn update(&self, update: &OrderUpdate) -> Result<UpdateReport> {
        let ticket_id = &update.ticket_id;

        let close = match &update.close {
            Some(users) => Some(
                self.transition(ticket_id, users, OrderStatus::Applied)
                    .await?,
            ),
            None => None,
        };

        let advance = match &update.advance {
            Some(advance) => Some(
                self.transition(ticket_id, advance.users(), advance.target())
                    .await?,
            ),
            None => None,
        };

        if close.is_none() && advance.is_none() {
            tracing::debug!(parent: &self.span, ticket_id = %ticket_id, "Order update had nothing to do");
        }

        Ok(UpdateReport {
            ticket_id: ticket_id.clone(),
            close,
            advance,
        })
    }
}
