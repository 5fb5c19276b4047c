//! Domain types for the Exchain contract.
//!
//! Field names on the wire follow the ledger's established JSON layout
//! (`Participant_UserID`, `Ticket_Value`, `Credit_TicketIDs`, ...), so records
//! written by earlier deployments keep decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for identifier parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid identifier: {0}")]
pub struct ParseIdError(String);

fn validate_id(kind: &str, raw: &str) -> Result<(), ParseIdError> {
    if raw.is_empty() {
        return Err(ParseIdError(format!("{kind} cannot be empty")));
    }
    if raw.contains('\u{0}') {
        return Err(ParseIdError(format!("{kind} {raw:?} contains U+0000")));
    }
    Ok(())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Returns the identifier as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                validate_id($kind, s)?;
                Ok(Self(s.to_string()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseIdError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                validate_id($kind, &s)?;
                Ok(Self(s))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a participant (also the key of its record).
    UserId,
    "user id"
);

string_id!(
    /// Identifier of a ticket (also the key of its record).
    TicketId,
    "ticket id"
);

/// Line of business a participant belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LineOfBusiness {
    /// Managing director's office
    MdOffice = 0,
    /// HANA
    Hana = 1,
    /// Small and midsize businesses
    Smb = 2,
    /// Industry business solutions
    Ibs = 3,
    /// S/4HANA
    S4Hana = 4,
    /// Global services
    Gs = 5,
    /// `SuccessFactors`
    Sf = 6,
    /// Internet of things
    Iot = 7,
}

impl TryFrom<u8> for LineOfBusiness {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::MdOffice,
            1 => Self::Hana,
            2 => Self::Smb,
            3 => Self::Ibs,
            4 => Self::S4Hana,
            5 => Self::Gs,
            6 => Self::Sf,
            7 => Self::Iot,
            other => return Err(format!("unknown line of business {other}")),
        })
    }
}

impl From<LineOfBusiness> for u8 {
    fn from(lob: LineOfBusiness) -> Self {
        lob as Self
    }
}

/// A registered participant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant identifier
    #[serde(rename = "Participant_UserID")]
    pub user_id: UserId,
    /// Display name
    #[serde(rename = "Participant_UserName")]
    pub user_name: String,
    /// Credential secret
    #[serde(rename = "Participant_Password")]
    pub password: String,
    /// Whether the participant administers the ledger
    #[serde(rename = "Participant_IsAdmin")]
    pub is_admin: bool,
    /// Line of business
    #[serde(rename = "Participant_LoB")]
    pub lob: LineOfBusiness,
}

impl Participant {
    /// Wire fields that must be present in a submitted participant.
    pub const REQUIRED_FIELDS: [&'static str; 5] = [
        "Participant_UserName",
        "Participant_UserID",
        "Participant_Password",
        "Participant_IsAdmin",
        "Participant_LoB",
    ];
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("user_id", &self.user_id)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("is_admin", &self.is_admin)
            .field("lob", &self.lob)
            .finish()
    }
}

/// The single record enumerating every participant id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantIndex {
    /// Participant ids in creation order
    #[serde(rename = "UserIDs", default, deserialize_with = "null_as_empty")]
    pub user_ids: Vec<UserId>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<UserId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<UserId>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ParticipantIndex {
    /// Whether the index lists `user_id`
    #[must_use]
    pub fn contains(&self, user_id: &UserId) -> bool {
        self.user_ids.contains(user_id)
    }

    /// Append `user_id` unless already listed; returns whether it was added
    pub fn insert(&mut self, user_id: UserId) -> bool {
        if self.contains(&user_id) {
            return false;
        }
        self.user_ids.push(user_id);
        true
    }

    /// Drop every occurrence of `user_id`; returns whether any was removed
    pub fn remove(&mut self, user_id: &UserId) -> bool {
        let before = self.user_ids.len();
        self.user_ids.retain(|id| id != user_id);
        self.user_ids.len() != before
    }
}

/// Progress of a ticket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TicketStatus {
    /// Published, open for applications
    #[default]
    Created = 0,
    /// At least one participant applied
    Applied = 1,
    /// Work in progress
    Ongoing = 2,
    /// Completed
    Done = 3,
}

impl TryFrom<u8> for TicketStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Created),
            1 => Ok(Self::Applied),
            2 => Ok(Self::Ongoing),
            3 => Ok(Self::Done),
            other => Err(format!("unknown ticket status {other}")),
        }
    }
}

impl From<TicketStatus> for u8 {
    fn from(status: TicketStatus) -> Self {
        status as Self
    }
}

/// A unit of work with a reward paid out on completion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier
    #[serde(rename = "Ticket_TicketID")]
    pub ticket_id: TicketId,
    /// Current status
    #[serde(rename = "Ticket_Status", default)]
    pub status: TicketStatus,
    /// Title
    #[serde(rename = "Ticket_Title")]
    pub title: String,
    /// Category
    #[serde(rename = "Ticket_Type", default)]
    pub ticket_type: u32,
    /// Reward credited to each awarded participant
    #[serde(rename = "Ticket_Value")]
    pub value: u64,
    /// Owning (creating) participant
    #[serde(rename = "Ticket_UserID")]
    pub user_id: UserId,
    /// Deadline
    #[serde(rename = "Ticket_Deadline", default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// Free-text comment
    #[serde(rename = "Ticket_Comment", default)]
    pub comment: String,
    /// Policy reference
    #[serde(rename = "Ticket_Policy", default)]
    pub policy: String,
}

impl Ticket {
    /// Wire fields that must be present in a submitted ticket.
    pub const REQUIRED_FIELDS: [&'static str; 4] = [
        "Ticket_TicketID",
        "Ticket_Title",
        "Ticket_Value",
        "Ticket_UserID",
    ];
}

/// Running reward balance of one participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    /// Owner
    #[serde(rename = "Credit_UserID")]
    pub user_id: UserId,
    /// Balance
    #[serde(rename = "Credit_Value")]
    pub value: u64,
    /// Tickets already credited to this participant, each at most once
    #[serde(rename = "Credit_TicketIDs", default, deserialize_with = "null_as_empty_tickets")]
    pub ticket_ids: Vec<TicketId>,
}

fn null_as_empty_tickets<'de, D>(deserializer: D) -> Result<Vec<TicketId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<TicketId>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Credit {
    /// Creates a credit with an opening balance and no credited tickets
    #[must_use]
    pub const fn new(user_id: UserId, value: u64) -> Self {
        Self {
            user_id,
            value,
            ticket_ids: Vec::new(),
        }
    }

    /// Whether `ticket_id` was already credited
    #[must_use]
    pub fn has_ticket(&self, ticket_id: &TicketId) -> bool {
        self.ticket_ids.contains(ticket_id)
    }
}

/// Status of an order.
///
/// The numeric value `1` is reserved: nothing writes it and decoding it fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OrderStatus {
    /// Applied for the ticket; also the state a closed order is reset to
    Applied = 0,
    /// Accepted by the ticket owner
    Confirmed = 2,
    /// Work delivered
    Done = 3,
    /// Reward paid out
    Awarded = 4,
}

impl OrderStatus {
    /// The status an order must hold before moving to `self`.
    ///
    /// `Applied` has none: writing it is unconditional.
    #[must_use]
    pub const fn predecessor(self) -> Option<Self> {
        match self {
            Self::Applied => None,
            Self::Confirmed => Some(Self::Applied),
            Self::Done => Some(Self::Confirmed),
            Self::Awarded => Some(Self::Done),
        }
    }
}

impl TryFrom<u8> for OrderStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Applied),
            1 => Err("order status 1 is reserved".to_string()),
            2 => Ok(Self::Confirmed),
            3 => Ok(Self::Done),
            4 => Ok(Self::Awarded),
            other => Err(format!("unknown order status {other}")),
        }
    }
}

impl From<OrderStatus> for u8 {
    fn from(status: OrderStatus) -> Self {
        status as Self
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Applied => "applied",
            Self::Confirmed => "confirmed",
            Self::Done => "done",
            Self::Awarded => "awarded",
        };
        f.write_str(name)
    }
}

/// A participant's claim against a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Ticket the order belongs to
    #[serde(rename = "TicketID")]
    pub ticket_id: TicketId,
    /// Claiming participant
    #[serde(rename = "UserID")]
    pub user_id: UserId,
    /// Current status
    #[serde(rename = "Status")]
    pub status: OrderStatus,
}

impl Order {
    /// Creates an order
    #[must_use]
    pub const fn new(ticket_id: TicketId, user_id: UserId, status: OrderStatus) -> Self {
        Self {
            ticket_id,
            user_id,
            status,
        }
    }
}
