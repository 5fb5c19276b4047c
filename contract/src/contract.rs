//! Function-name dispatch.
//!
//! [`Contract::invoke`] is the single entry point a host calls. Arguments are
//! decoded into an [`Invocation`] before anything touches the ledger, so a
//! malformed call never writes.

use crate::credit::CreditLedger;
use crate::environment::ContractEnvironment;
use crate::error::{ContractError, Result};
use crate::order::OrderLifecycle;
use crate::participant::ParticipantRepository;
use crate::request::{OrderUpdate, expect_args, parse_amount, parse_id};
use crate::ticket::TicketRepository;
use crate::types::{TicketId, UserId};
use serde::Serialize;
use tracing::Span;

/// Outcome of an invocation as seen by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// The call succeeded, optionally returning a JSON payload
    Success(Option<Vec<u8>>),
    /// The call failed with a message
    Error(String),
}

impl Response {
    /// Successful response with a payload
    #[must_use]
    pub const fn success(payload: Vec<u8>) -> Self {
        Self::Success(Some(payload))
    }

    /// Failed response
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Whether the call succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Payload of a successful response
    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Success(payload) => payload.as_deref(),
            Self::Error(_) => None,
        }
    }

    /// Message of a failed response
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error(message) => Some(message),
        }
    }
}

/// A decoded call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// `Init`
    Init,
    /// `addParticipant(json)`
    AddParticipant(String),
    /// `readParticipant(user)`
    ReadParticipant(UserId),
    /// `updateParticipant(json)`
    UpdateParticipant(String),
    /// `deleteParticipant(user)`
    DeleteParticipant(UserId),
    /// `readParticipantIndex`
    ReadParticipantIndex,
    /// `CreditCreate(user, initial)`
    CreditCreate(UserId, u64),
    /// `CreditRead(user)`
    CreditRead(UserId),
    /// `CreditUpdate(user, value, ticket)`
    CreditUpdate(UserId, u64, TicketId),
    /// `CreditDelete(user)`
    CreditDelete(UserId),
    /// `TicketCreate(json)`
    TicketCreate(String),
    /// `TicketRead(ticket)`
    TicketRead(TicketId),
    /// `TicketUpdate(actor, json)`
    TicketUpdate(UserId, String),
    /// `TicketDelete(ticket)`
    TicketDelete(TicketId),
    /// `TicketHistory(ticket)`
    TicketHistory(TicketId),
    /// `OrderApply(ticket, user)`
    OrderApply(TicketId, UserId),
    /// `OrderRead(ticket, user)`
    OrderRead(TicketId, UserId),
    /// `OrderReadAll(ticket)`, also reachable as `OrderRead2`
    OrderReadAll(TicketId),
    /// `OrderUpdate(json)`
    OrderUpdate(OrderUpdate),
}

impl Invocation {
    /// Decode a function name and its positional arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::Validation`] for an unknown function, a wrong
    /// argument count, or an argument that does not parse.
    pub fn parse(function: &str, args: &[String]) -> Result<Self> {
        Ok(match function {
            "Init" => {
                let [] = expect_args::<0>(function, args)?;
                Self::Init
            }
            "addParticipant" => {
                let [json] = expect_args::<1>(function, args)?;
                Self::AddParticipant(json.to_string())
            }
            "readParticipant" => {
                let [user] = expect_args::<1>(function, args)?;
                Self::ReadParticipant(parse_id(user)?)
            }
            "updateParticipant" => {
                let [json] = expect_args::<1>(function, args)?;
                Self::UpdateParticipant(json.to_string())
            }
            "deleteParticipant" => {
                let [user] = expect_args::<1>(function, args)?;
                Self::DeleteParticipant(parse_id(user)?)
            }
            "readParticipantIndex" => {
                let [] = expect_args::<0>(function, args)?;
                Self::ReadParticipantIndex
            }
            "CreditCreate" => {
                let [user, initial] = expect_args::<2>(function, args)?;
                Self::CreditCreate(parse_id(user)?, parse_amount("initial value", initial)?)
            }
            "CreditRead" => {
                let [user] = expect_args::<1>(function, args)?;
                Self::CreditRead(parse_id(user)?)
            }
            "CreditUpdate" => {
                let [user, value, ticket] = expect_args::<3>(function, args)?;
                Self::CreditUpdate(
                    parse_id(user)?,
                    parse_amount("value", value)?,
                    parse_id(ticket)?,
                )
            }
            "CreditDelete" => {
                let [user] = expect_args::<1>(function, args)?;
                Self::CreditDelete(parse_id(user)?)
            }
            "TicketCreate" => {
                let [json] = expect_args::<1>(function, args)?;
                Self::TicketCreate(json.to_string())
            }
            "TicketRead" => {
                let [ticket] = expect_args::<1>(function, args)?;
                Self::TicketRead(parse_id(ticket)?)
            }
            "TicketUpdate" => {
                let [actor, json] = expect_args::<2>(function, args)?;
                Self::TicketUpdate(parse_id(actor)?, json.to_string())
            }
            "TicketDelete" => {
                let [ticket] = expect_args::<1>(function, args)?;
                Self::TicketDelete(parse_id(ticket)?)
            }
            "TicketHistory" => {
                let [ticket] = expect_args::<1>(function, args)?;
                Self::TicketHistory(parse_id(ticket)?)
            }
            "OrderApply" => {
                let [ticket, user] = expect_args::<2>(function, args)?;
                Self::OrderApply(parse_id(ticket)?, parse_id(user)?)
            }
            "OrderRead" => {
                let [ticket, user] = expect_args::<2>(function, args)?;
                Self::OrderRead(parse_id(ticket)?, parse_id(user)?)
            }
            "OrderReadAll" | "OrderRead2" => {
                let [ticket] = expect_args::<1>(function, args)?;
                Self::OrderReadAll(parse_id(ticket)?)
            }
            "OrderUpdate" => {
                let [json] = expect_args::<1>(function, args)?;
                Self::OrderUpdate(json.parse()?)
            }
            other => {
                return Err(ContractError::validation(format!(
                    "received unknown function invocation {other:?}"
                )));
            }
        })
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<Option<Vec<u8>>> {
    serde_json::to_vec(value)
        .map(Some)
        .map_err(|e| ContractError::Serialization(e.to_string()))
}

/// The Exchain contract: participants, tickets, credits and the order
/// lifecycle over one ledger.
#[derive(Clone)]
pub struct Contract {
    participants: ParticipantRepository,
    tickets: TicketRepository,
    credits: CreditLedger,
    orders: OrderLifecycle,
    span: Span,
}

impl Contract {
    /// Creates a contract over the environment's ledger
    #[must_use]
    pub fn new(env: &ContractEnvironment) -> Self {
        Self {
            participants: ParticipantRepository::new(env),
            tickets: TicketRepository::new(env),
            credits: CreditLedger::new(env),
            orders: OrderLifecycle::new(env),
            span: env.component_span("dispatch"),
        }
    }

    /// Participant repository
    #[must_use]
    pub const fn participants(&self) -> &ParticipantRepository {
        &self.participants
    }

    /// Ticket repository
    #[must_use]
    pub const fn tickets(&self) -> &TicketRepository {
        &self.tickets
    }

    /// Credit ledger
    #[must_use]
    pub const fn credits(&self) -> &CreditLedger {
        &self.credits
    }

    /// Order lifecycle manager
    #[must_use]
    pub const fn orders(&self) -> &OrderLifecycle {
        &self.orders
    }

    /// Decode and run one call. Never panics; every failure becomes
    /// [`Response::Error`].
    #[tracing::instrument(parent = &self.span, skip(self, args), fields(args = args.len()))]
    pub async fn invoke(&self, function: &str, args: Vec<String>) -> Response {
        let result = match Invocation::parse(function, &args) {
            Ok(invocation) => self.execute(invocation).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(payload) => {
                tracing::debug!("Invocation succeeded");
                Response::Success(payload)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Invocation failed");
                Response::Error(e.to_string())
            }
        }
    }

    /// Run a decoded call, returning its JSON payload.
    ///
    /// # Errors
    ///
    /// Whatever the targeted component returns.
    pub async fn execute(&self, invocation: Invocation) -> Result<Option<Vec<u8>>> {
        match invocation {
            Invocation::Init => {
                self.participants.init_index().await?;
                Ok(None)
            }
            Invocation::AddParticipant(json) => {
                self.participants.create(&json).await?;
                Ok(None)
            }
            Invocation::ReadParticipant(user) => to_payload(&self.participants.read(&user).await?),
            Invocation::UpdateParticipant(json) => {
                self.participants.update(&json).await?;
                Ok(None)
            }
            Invocation::DeleteParticipant(user) => {
                self.participants.delete(&user).await?;
                Ok(None)
            }
            Invocation::ReadParticipantIndex => to_payload(&self.participants.index().await?),
            Invocation::CreditCreate(user, initial) => {
                to_payload(&self.credits.create(&user, initial).await?)
            }
            Invocation::CreditRead(user) => to_payload(&self.credits.read(&user).await?),
            Invocation::CreditUpdate(user, value, ticket) => {
                let (credit, _) = self.credits.increment(&user, value, &ticket).await?;
                to_payload(&credit)
            }
            Invocation::CreditDelete(user) => {
                self.credits.delete(&user).await?;
                Ok(None)
            }
            Invocation::TicketCreate(json) => {
                self.tickets.create(&json).await?;
                Ok(None)
            }
            Invocation::TicketRead(ticket) => to_payload(&self.tickets.read(&ticket).await?),
            Invocation::TicketUpdate(actor, json) => {
                self.tickets.update(&actor, &json).await?;
                Ok(None)
            }
            Invocation::TicketDelete(ticket) => {
                self.tickets.delete(&ticket).await?;
                Ok(None)
            }
            Invocation::TicketHistory(ticket) => to_payload(&self.tickets.history(&ticket).await?),
            Invocation::OrderApply(ticket, user) => {
                self.orders.apply(&ticket, &user).await?;
                Ok(None)
            }
            Invocation::OrderRead(ticket, user) => to_payload(&self.orders.read(&ticket, &user).await?),
            Invocation::OrderReadAll(ticket) => Ok(Some(self.orders.enumerate_json(&ticket).await?)),
            Invocation::OrderUpdate(update) => to_payload(&self.orders.update(&update).await?),
        }
    }
}
