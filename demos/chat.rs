//! Interactive chat demonstration.
//!
//! Demonstrates:
//! - Building a client from environment variables
//! - Initializing (session id, guest token, connect)
//! - Sending stdin lines and printing bot replies
//! - Watching connection state changes
//!
//! Usage:
//!   GUEST_CHAT_API_URL=https://api.example.com \
//!   GUEST_CHAT_WS_URL=https://chat.example.com \
//!   cargo run --example chat -- --debug

// ============================================================================
// Imports
// ============================================================================

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use guest_chat::{ChatClientBuilder, Result, Transcript};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|a| a == "--debug");
    let filter = if debug { "guest_chat=debug" } else { "guest_chat=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== Guest chat ===\n");

    let client = ChatClientBuilder::from_env().build()?;
    println!("[Setup] Session: {}", client.session_id()?);

    client.on_message(|reply| println!("bot> {}", reply.text));

    let mut states = client.watch_state();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            println!("[State] {}", *states.borrow_and_update());
        }
    });

    client.initialize().await?;
    println!("[Ready] Type a message, empty line to quit.\n");

    let mut transcript = Transcript::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            break;
        }
        match client.send_message(line).await {
            Ok(sent) => transcript.push(sent),
            Err(e) => println!("[Send failed] {e}"),
        }
    }

    client.disconnect().await;
    println!("\n[Done] {} message(s) sent", transcript.len());
    Ok(())
}
