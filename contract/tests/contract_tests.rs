//! Participant, ticket and credit operations through the contract entry point.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use common::{Harness, participant_json, ticket_json};
use exchain::{Credit, Participant, ParticipantIndex, Response, Ticket, UserId};
use serde_json::Value;

fn ids(index: &ParticipantIndex) -> Vec<&str> {
    index.user_ids.iter().map(UserId::as_str).collect()
}

#[tokio::test]
async fn unknown_function_is_an_error() {
    let h = Harness::new();
    let message = h.err("transferAll", &[]).await;
    assert!(message.contains("unknown function"), "{message}");
}

#[tokio::test]
async fn wrong_argument_count_is_an_error() {
    let h = Harness::new();
    let message = h.err("readParticipant", &[]).await;
    assert!(message.contains("expecting 1, got 0"), "{message}");
    let message = h.err("TicketUpdate", &["owner"]).await;
    assert!(message.contains("expecting 2, got 1"), "{message}");
}

#[tokio::test]
async fn init_resets_the_index() {
    let h = Harness::new();
    h.add_participant("alice").await;
    h.ok("Init", &[]).await;

    let index: ParticipantIndex = h.ok_json("readParticipantIndex", &[]).await;
    assert!(index.user_ids.is_empty());
    assert!(h.ledger.contains_key("readingIDIndex"));
}

#[tokio::test]
async fn participant_membership_follows_create_and_delete() {
    let h = Harness::new();
    h.ok("Init", &[]).await;
    h.add_participant("alice").await;
    h.add_participant("bob").await;

    let index: ParticipantIndex = h.ok_json("readParticipantIndex", &[]).await;
    assert_eq!(ids(&index), ["alice", "bob"]);

    h.ok("deleteParticipant", &["alice"]).await;
    let index: ParticipantIndex = h.ok_json("readParticipantIndex", &[]).await;
    assert_eq!(ids(&index), ["bob"]);
    assert!(h.err("readParticipant", &["alice"]).await.contains("does not exist"));
}

#[tokio::test]
async fn participant_read_returns_stored_record() {
    let h = Harness::new();
    h.add_participant("alice").await;

    let participant: Participant = h.ok_json("readParticipant", &["alice"]).await;
    assert_eq!(participant.user_name, "ALICE");

    let raw: Value = h.ok_json("readParticipant", &["alice"]).await;
    assert_eq!(raw["Participant_LoB"], 2);
}

#[tokio::test]
async fn participant_create_checks_schema_and_duplicates() {
    let h = Harness::new();
    let message = h
        .err("addParticipant", &[r#"{"Participant_UserID":"alice"}"#])
        .await;
    assert!(message.contains("corrupted"), "{message}");
    assert!(h.ledger.is_empty());

    h.add_participant("alice").await;
    let message = h
        .err("addParticipant", &[participant_json("alice").as_str()])
        .await;
    assert!(message.contains("already exists"), "{message}");
}

#[tokio::test]
async fn participant_update_overwrites() {
    let h = Harness::new();
    h.add_participant("alice").await;

    let mut updated: Value = serde_json::from_str(&participant_json("alice")).unwrap();
    updated["Participant_UserName"] = "Alice A.".into();
    h.ok("updateParticipant", &[updated.to_string().as_str()]).await;

    let participant: Participant = h.ok_json("readParticipant", &["alice"]).await;
    assert_eq!(participant.user_name, "Alice A.");

    let message = h
        .err("updateParticipant", &[participant_json("nobody").as_str()])
        .await;
    assert!(message.contains("does not exist"), "{message}");
}

#[tokio::test]
async fn deleting_an_unindexed_participant_writes_nothing() {
    let h = Harness::new();
    h.add_participant("alice").await;
    h.ok("Init", &[]).await;
    let writes = h.ledger.write_count();

    let message = h.err("deleteParticipant", &["alice"]).await;
    assert!(message.contains("index invariant"), "{message}");
    assert_eq!(h.ledger.write_count(), writes);
    assert!(h.ledger.contains_key("alice"));
}

#[tokio::test]
async fn ticket_crud() {
    let h = Harness::new();
    h.add_ticket("t1", "owner", 30).await;
    assert!(
        h.err("TicketCreate", &[ticket_json("t1", "owner", 5).as_str()])
            .await
            .contains("already exists")
    );

    let ticket: Ticket = h.ok_json("TicketRead", &["t1"]).await;
    assert_eq!(ticket.value, 30);

    h.ok("TicketUpdate", &["owner", ticket_json("t1", "owner", 50).as_str()])
        .await;
    let ticket: Ticket = h.ok_json("TicketRead", &["t1"]).await;
    assert_eq!(ticket.value, 50);

    h.ok("TicketDelete", &["t1"]).await;
    assert!(h.err("TicketRead", &["t1"]).await.contains("does not exist"));
    assert!(h.err("TicketDelete", &["t1"]).await.contains("does not exist"));
}

#[tokio::test]
async fn ticket_delete_leaves_other_records_alone() {
    let h = Harness::new();
    h.ok("Init", &[]).await;
    h.add_participant("u1").await;
    h.ok("CreditCreate", &["u1", "3"]).await;
    let keys = h.ledger.keys();

    for key in ["u1", "readingIDIndex", "Credit_u1"] {
        let message = h.err("TicketDelete", &[key]).await;
        assert!(message.contains("Corrupt ticket record"), "{key}: {message}");
    }

    assert_eq!(h.ledger.keys(), keys);
    let index: ParticipantIndex = h.ok_json("readParticipantIndex", &[]).await;
    assert_eq!(ids(&index), ["u1"]);
    let participant: Participant = h.ok_json("readParticipant", &["u1"]).await;
    assert_eq!(participant.user_id.as_str(), "u1");
}

#[tokio::test]
async fn ticket_update_checks_owner_and_existence() {
    let h = Harness::new();
    h.add_ticket("t1", "owner", 30).await;

    let message = h
        .err("TicketUpdate", &["mallory", ticket_json("t1", "owner", 99).as_str()])
        .await;
    assert_eq!(message, "mallory has no rights to update ticket t1");

    let message = h
        .err("TicketUpdate", &["owner", ticket_json("t2", "owner", 1).as_str()])
        .await;
    assert!(message.contains("ticket t2 does not exist"), "{message}");
}

#[tokio::test]
async fn ticket_history_is_a_json_array() {
    let h = Harness::new();
    h.add_ticket("t1", "owner", 30).await;
    h.ok("TicketUpdate", &["owner", ticket_json("t1", "owner", 31).as_str()])
        .await;

    let history: Vec<Value> = h.ok_json("TicketHistory", &["t1"]).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["TxId"], "tx-000001");
    assert_eq!(history[0]["IsDelete"], false);
    assert_eq!(history[1]["Value"]["Ticket_Value"], 31);
    assert_eq!(history[0]["Timestamp"], "2025-01-01T00:00:00Z");
}

#[tokio::test]
async fn credit_update_is_idempotent_per_ticket() {
    let h = Harness::new();
    let created: Credit = h.ok_json("CreditCreate", &["alice", "10"]).await;
    assert_eq!(created.value, 10);

    let once: Credit = h.ok_json("CreditUpdate", &["alice", "30", "t1"]).await;
    let twice: Credit = h.ok_json("CreditUpdate", &["alice", "30", "t1"]).await;
    assert_eq!(once, twice);
    assert_eq!(twice.value, 40);

    let other: Credit = h.ok_json("CreditUpdate", &["alice", "5", "t2"]).await;
    assert_eq!(other.value, 45);
    assert_eq!(other.ticket_ids.len(), 2);
}

#[tokio::test]
async fn credit_errors() {
    let h = Harness::new();
    assert!(h.err("CreditRead", &["alice"]).await.contains("does not exist"));
    assert!(
        h.err("CreditUpdate", &["alice", "1", "t1"])
            .await
            .contains("does not exist")
    );
    assert!(h.err("CreditCreate", &["alice", "ten"]).await.contains("Invalid input"));

    h.ok("CreditCreate", &["alice", "0"]).await;
    assert!(h.err("CreditCreate", &["alice", "1"]).await.contains("already exists"));

    h.ok("CreditDelete", &["alice"]).await;
    assert!(h.err("CreditDelete", &["alice"]).await.contains("does not exist"));
}

#[tokio::test]
async fn failed_write_surfaces_as_error_response() {
    let h = Harness::new();
    h.ledger.fail_writes_after(0);

    let response = h.invoke("CreditCreate", &["alice", "1"]).await;
    assert!(!response.is_success());
    assert!(matches!(response, Response::Error(ref m) if m.contains("Ledger")));
}
