//! Exchain - participants, tickets, credits and an order lifecycle over a
//! keyed ledger
//!
//! Participants publish tickets carrying a reward. Other participants apply
//! for a ticket, the owner confirms them, the work is marked done, and on
//! award every listed participant is credited the ticket value exactly once.
//!
//! # Architecture
//!
//! ```text
//!                    Contract::invoke(function, args)
//!                                 │
//!                        Invocation::parse
//!                                 │
//!      ┌──────────────┬───────────┴──────┬──────────────────┐
//!      ▼              ▼                  ▼                  ▼
//! ┌───────────┐ ┌───────────┐    ┌───────────────┐   ┌────────────┐
//! │Participant│ │  Ticket   │    │OrderLifecycle │──►│CreditLedger│
//! │Repository │ │Repository │◄───│ (award pass)  │   │            │
//! └───────────┘ └───────────┘    └───────────────┘   └────────────┘
//!      │              │                  │                  │
//!      └──────────────┴────────┬─────────┴──────────────────┘
//!                              ▼
//!                    Arc<dyn LedgerStore>
//! ```
//!
//! Every component takes its ledger, key layout and parent tracing span from
//! a [`ContractEnvironment`].
//!
//! # Usage
//!
//! ```
//! use exchain::{Contract, ContractEnvironment};
//! use exchain_testing::InMemoryLedgerStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let env = ContractEnvironment::new(Arc::new(InMemoryLedgerStore::new()));
//! let contract = Contract::new(&env);
//!
//! let response = contract.invoke("Init", Vec::new()).await;
//! assert!(response.is_success());
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod contract;
pub mod credit;
pub mod environment;
pub mod error;
pub mod order;
pub mod participant;
pub mod request;
pub mod ticket;
pub mod types;

pub use config::{ContractConfig, KeyConfig};
pub use contract::{Contract, Invocation, Response};
pub use credit::{AwardOutcome, CreditLedger};
pub use environment::ContractEnvironment;
pub use error::{ContractError, Result};
pub use order::{
    AwardEntry, OrderLifecycle, SkipReason, TransitionEntry, TransitionOutcome, TransitionReport,
    UpdateReport,
};
pub use participant::ParticipantRepository;
pub use request::{Advance, OrderUpdate};
pub use ticket::{TicketRepository, TicketRevision};
pub use types::*;
