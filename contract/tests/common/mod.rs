//! Shared fixtures for contract integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::panic)]

use exchain::{Contract, ContractEnvironment, Credit, Order, Response};
use exchain_testing::InMemoryLedgerStore;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// A contract wired to an in-memory ledger the test can inspect.
pub struct Harness {
    pub ledger: InMemoryLedgerStore,
    pub contract: Contract,
}

impl Harness {
    pub fn new() -> Self {
        exchain_testing::init_tracing();
        let ledger = InMemoryLedgerStore::new();
        let env = ContractEnvironment::new(Arc::new(ledger.clone()));
        let contract = Contract::new(&env);
        Self { ledger, contract }
    }

    pub async fn invoke(&self, function: &str, args: &[&str]) -> Response {
        let args = args.iter().map(ToString::to_string).collect();
        self.contract.invoke(function, args).await
    }

    /// Invoke and fail the test on an error response.
    pub async fn ok(&self, function: &str, args: &[&str]) -> Option<Vec<u8>> {
        match self.invoke(function, args).await {
            Response::Success(payload) => payload,
            Response::Error(message) => panic!("{function}{args:?} failed: {message}"),
        }
    }

    /// Invoke, expect an error response and return its message.
    pub async fn err(&self, function: &str, args: &[&str]) -> String {
        match self.invoke(function, args).await {
            Response::Error(message) => message,
            Response::Success(_) => panic!("{function}{args:?} unexpectedly succeeded"),
        }
    }

    pub async fn ok_json<T: DeserializeOwned>(&self, function: &str, args: &[&str]) -> T {
        let payload = self.ok(function, args).await.unwrap();
        serde_json::from_slice(&payload).unwrap()
    }

    pub async fn credit(&self, user: &str) -> Credit {
        self.ok_json("CreditRead", &[user]).await
    }

    pub async fn order(&self, ticket: &str, user: &str) -> Order {
        self.ok_json("OrderRead", &[ticket, user]).await
    }

    pub async fn order_update(&self, request: serde_json::Value) -> serde_json::Value {
        self.ok_json("OrderUpdate", &[request.to_string().as_str()]).await
    }

    /// Register a participant with default fields.
    pub async fn add_participant(&self, user: &str) {
        self.ok("addParticipant", &[participant_json(user).as_str()]).await;
    }

    /// Publish a ticket owned by `owner`.
    pub async fn add_ticket(&self, ticket: &str, owner: &str, value: u64) {
        self.ok("TicketCreate", &[ticket_json(ticket, owner, value).as_str()])
            .await;
    }

    /// Apply every user, then walk them forward through the listed steps.
    pub async fn drive(&self, ticket: &str, users: &[&str], steps: &[&str]) {
        for &user in users {
            self.ok("OrderApply", &[ticket, user]).await;
        }
        for step in steps {
            let mut request = serde_json::json!({ "TicketID": ticket });
            request[*step] = serde_json::json!(users);
            self.order_update(request).await;
        }
    }
}

pub fn participant_json(user: &str) -> String {
    serde_json::json!({
        "Participant_UserID": user,
        "Participant_UserName": user.to_uppercase(),
        "Participant_Password": "secret",
        "Participant_IsAdmin": false,
        "Participant_LoB": 2,
    })
    .to_string()
}

pub fn ticket_json(ticket: &str, owner: &str, value: u64) -> String {
    serde_json::json!({
        "Ticket_TicketID": ticket,
        "Ticket_Title": format!("Ticket {ticket}"),
        "Ticket_Value": value,
        "Ticket_UserID": owner,
    })
    .to_string()
}
