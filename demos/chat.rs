//! Terminal chat over a multiplexed connection.
//!
//! Demonstrates:
//! - A catch-all handler acting as the view layer: status records update a
//!   status line, every other channel appends to its own message list
//! - Sending on arbitrary channels before and after the connection opens
//! - Graceful shutdown
//!
//! Type `<channel> <message>` to send, `/board` to print every channel's
//! messages, `/quit` to exit.
//!
//! Usage:
//!   cargo run --example chat -- --uri ws://127.0.0.1:5775/ws/demo
//!   cargo run --example chat -- --debug
//!   cargo run --example chat -- --no-retry

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use common::Args;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use wsmux::{Client, Status};

// ============================================================================
// Board
// ============================================================================

/// Minimal view layer: one status line plus a message list per channel.
#[derive(Debug, Default)]
struct Board {
    status: String,
    error: bool,
    channels: BTreeMap<String, Vec<String>>,
}

impl Board {
    fn apply(&mut self, channel: &str, payload: &str) {
        if channel.is_empty() {
            let Some(status) = Status::from_payload(payload) else {
                return;
            };
            self.error = status.error;
            if !status.message.is_empty() && status.message != self.status {
                self.status = status.message;
                let marker = if self.error { "!" } else { "*" };
                println!("[{marker}] {}", self.status);
            }
            return;
        }

        self.error = false;
        println!("[{channel}] {payload}");
        self.channels
            .entry(channel.to_owned())
            .or_default()
            .push(payload.to_owned());
    }

    fn print(&self) {
        println!("--- status: {} ---", self.status);
        for (channel, messages) in &self.channels {
            println!("{channel}:");
            for message in messages {
                println!("  {message}");
            }
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== chat: {} ===\n", args.uri);

    let client = Client::builder()
        .uri(&args.uri)
        .retry(!args.no_retry)
        .build()?;

    let board = Arc::new(Mutex::new(Board::default()));
    let view = Arc::clone(&board);
    client.register("", move |channel, payload| {
        view.lock().apply(channel, payload);
        Ok(())
    });

    client.start()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/board" => board.lock().print(),
            _ => {
                let (channel, message) = line.split_once(' ').unwrap_or((line, ""));
                client.send(channel, message)?;
            }
        }
    }

    client.close()?;
    // Give the closing handshake a moment before the runtime exits.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    Ok(())
}
