//! Exchain Demo
//!
//! Walks one ticket through its whole lifecycle against an in-memory ledger:
//! - participant registration
//! - ticket publication
//! - applications, confirmation, completion
//! - award, and a repeated award that credits nothing
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info,exchain=debug cargo run --bin demo
//! ```

use exchain::{Contract, ContractConfig, ContractEnvironment, Response};
use exchain_core::environment::SystemClock;
use exchain_testing::InMemoryLedgerStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn participant(id: &str, name: &str, lob: u8) -> String {
    serde_json::json!({
        "Participant_UserID": id,
        "Participant_UserName": name,
        "Participant_Password": "demo",
        "Participant_IsAdmin": false,
        "Participant_LoB": lob,
    })
    .to_string()
}

async fn call(contract: &Contract, function: &str, args: &[&str]) -> Result<Response, String> {
    let args = args.iter().map(ToString::to_string).collect();
    match contract.invoke(function, args).await {
        Response::Error(message) => Err(format!("{function} failed: {message}")),
        response => Ok(response),
    }
}

fn show(label: &str, response: &Response) {
    let payload = response
        .payload()
        .map(String::from_utf8_lossy)
        .unwrap_or_default();
    println!("   {label}: {payload}");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = ContractConfig::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n============================================");
    println!("   Exchain - Ticket Lifecycle Demo");
    println!("============================================\n");

    let ledger = InMemoryLedgerStore::with_clock(Arc::new(SystemClock));
    let env = ContractEnvironment::new(Arc::new(ledger.clone())).with_config(config);
    let contract = Contract::new(&env);

    println!("1. Registering participants...");
    call(&contract, "Init", &[]).await?;
    for (id, name, lob) in [("owner", "Olivia", 0), ("alice", "Alice", 1), ("bob", "Bob", 4)] {
        call(&contract, "addParticipant", &[participant(id, name, lob).as_str()]).await?;
    }
    show("index", &call(&contract, "readParticipantIndex", &[]).await?);

    println!("\n2. Opening credits and publishing ticket t1 (value 30)...");
    call(&contract, "CreditCreate", &["alice", "10"]).await?;
    let ticket = serde_json::json!({
        "Ticket_TicketID": "t1",
        "Ticket_Title": "Migrate reporting to S/4HANA",
        "Ticket_Value": 30,
        "Ticket_UserID": "owner",
    })
    .to_string();
    call(&contract, "TicketCreate", &[ticket.as_str()]).await?;

    println!("\n3. Alice and Bob apply...");
    call(&contract, "OrderApply", &["t1", "alice"]).await?;
    call(&contract, "OrderApply", &["t1", "bob"]).await?;

    println!("\n4. Owner confirms, then marks done...");
    show(
        "confirm",
        &call(&contract, "OrderUpdate", &[r#"{"TicketID":"t1","Confirm":["alice","bob"]}"#]).await?,
    );
    show(
        "done",
        &call(&contract, "OrderUpdate", &[r#"{"TicketID":"t1","Done":["alice","bob"]}"#]).await?,
    );

    println!("\n5. Award...");
    let award = r#"{"TicketID":"t1","Award":["alice","bob"]}"#;
    show("award", &call(&contract, "OrderUpdate", &[award]).await?);
    show("alice", &call(&contract, "CreditRead", &["alice"]).await?);
    show("bob", &call(&contract, "CreditRead", &["bob"]).await?);

    println!("\n6. Award again (nothing is credited twice)...");
    show("award", &call(&contract, "OrderUpdate", &[award]).await?);
    show("alice", &call(&contract, "CreditRead", &["alice"]).await?);

    println!("\n7. Final state");
    show("orders", &call(&contract, "OrderReadAll", &["t1"]).await?);
    show("ticket history", &call(&contract, "TicketHistory", &["t1"]).await?);
    println!("   ledger keys: {}", ledger.len());

    println!("\nDone.\n");
    Ok(())
}
