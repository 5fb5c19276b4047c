//! Decoding and validation of caller input.
//!
//! Everything a caller submits is checked here, once, before any component
//! touches the ledger. Components only ever see typed values.

use crate::error::{ContractError, Result};
use crate::types::{OrderStatus, ParseIdError, TicketId, UserId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::str::FromStr;

/// Take exactly `N` positional arguments.
///
/// # Errors
///
/// Returns [`ContractError::Validation`] if `args` has any other length.
pub fn expect_args<'a, const N: usize>(function: &str, args: &'a [String]) -> Result<[&'a str; N]> {
    let found = args.len();
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    <[&str; N]>::try_from(refs).map_err(|_| {
        ContractError::validation(format!(
            "{function}: incorrect number of arguments, expecting {N}, got {found}"
        ))
    })
}

/// Parse an identifier argument.
///
/// # Errors
///
/// Returns [`ContractError::Validation`] if the identifier is empty or
/// contains U+0000.
pub fn parse_id<T>(raw: &str) -> Result<T>
where
    T: FromStr<Err = ParseIdError>,
{
    raw.parse()
        .map_err(|e: ParseIdError| ContractError::validation(e.to_string()))
}

/// Parse a non-negative amount argument.
///
/// # Errors
///
/// Returns [`ContractError::Validation`] if `raw` is not a non-negative
/// integer that fits in 64 bits.
pub fn parse_amount(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ContractError::validation(format!("incorrect {name}: {raw:?}")))
}

/// Decode a submitted record after checking every required field is present.
///
/// Presence is all that is checked up front; the typed decode that follows
/// enforces the field types.
///
/// # Errors
///
/// Returns [`ContractError::CorruptedInput`] if `raw` is not a JSON object,
/// misses a required field, or does not decode into `T`.
pub fn decode_submitted<T: DeserializeOwned>(
    entity: &'static str,
    raw: &str,
    required: &[&str],
) -> Result<T> {
    let corrupted = |reason: String| ContractError::CorruptedInput { entity, reason };

    let value: Value = serde_json::from_str(raw).map_err(|e| corrupted(e.to_string()))?;
    let Some(object) = value.as_object() else {
        return Err(corrupted("input is not a JSON object".to_string()));
    };

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|field| !object.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(corrupted(format!(
            "input does not comply to schema, missing {}",
            missing.join(", ")
        )));
    }

    serde_json::from_value(value).map_err(|e| corrupted(e.to_string()))
}

/// The advancing half of an order update: which forward transition to apply
/// and to whom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Applied → Confirmed
    Confirm(Vec<UserId>),
    /// Confirmed → Done
    Done(Vec<UserId>),
    /// Done → Awarded, followed by the award pass
    Award(Vec<UserId>),
}

impl Advance {
    /// Status the listed orders move to
    #[must_use]
    pub const fn target(&self) -> OrderStatus {
        match self {
            Self::Confirm(_) => OrderStatus::Confirmed,
            Self::Done(_) => OrderStatus::Done,
            Self::Award(_) => OrderStatus::Awarded,
        }
    }

    /// Participants the transition is applied to, in request order
    #[must_use]
    pub fn users(&self) -> &[UserId] {
        match self {
            Self::Confirm(users) | Self::Done(users) | Self::Award(users) => users,
        }
    }
}

/// A validated bulk order update.
///
/// `close` is applied first, then `advance`. A request naming several
/// advances keeps only the first of `Confirm`, `Done` and `Award`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderUpdate {
    /// Ticket whose orders change
    pub ticket_id: TicketId,
    /// Participants whose orders are reset to `Applied`
    pub close: Option<Vec<UserId>>,
    /// Forward transition, if any
    pub advance: Option<Advance>,
}

#[derive(Deserialize)]
struct RawOrderUpdate {
    #[serde(rename = "TicketID", alias = "ticketID", alias = "ticket_id", default)]
    ticket_id: Option<String>,
    #[serde(rename = "Close", alias = "close", default)]
    close: Option<Vec<String>>,
    #[serde(rename = "Confirm", alias = "confirm", default)]
    confirm: Option<Vec<String>>,
    #[serde(rename = "Done", alias = "done", default)]
    done: Option<Vec<String>>,
    #[serde(rename = "Award", alias = "award", default)]
    award: Option<Vec<String>>,
}

fn parse_users(field: &str, raw: Option<Vec<String>>) -> Result<Option<Vec<UserId>>> {
    raw.map(|users| {
        users
            .iter()
            .map(|user| {
                parse_id::<UserId>(user)
                    .map_err(|e| ContractError::validation(format!("{field}: {e}")))
            })
            .collect()
    })
    .transpose()
}

impl FromStr for OrderUpdate {
    type Err = ContractError;

    fn from_str(raw: &str) -> Result<Self> {
        let request: RawOrderUpdate = serde_json::from_str(raw)
            .map_err(|e| ContractError::validation(format!("OrderUpdate: {e}")))?;

        let ticket_id = request
            .ticket_id
            .ok_or_else(|| ContractError::validation("OrderUpdate: TicketID is needed"))?;
        let ticket_id = parse_id(&ticket_id)?;

        let close = parse_users("Close", request.close)?;
        let mut advances = [
            parse_users("Confirm", request.confirm)?.map(Advance::Confirm),
            parse_users("Done", request.done)?.map(Advance::Done),
            parse_users("Award", request.award)?.map(Advance::Award),
        ]
        .into_iter()
        .flatten();

        let advance = advances.next();
        for ignored in advances {
            tracing::warn!(
                ticket_id = %ticket_id,
                ignored = %ignored.target(),
                "Ignoring lower-precedence advance in OrderUpdate"
            );
        }

        Ok(Self {
            ticket_id,
            close,
            advance,
        })
    }
}
