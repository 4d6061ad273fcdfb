//! wsmux - Channel-multiplexed, auto-reconnecting WebSocket client.
//!
//! One physical WebSocket connection carries many independent logical
//! topics ("channels"). The client reconnects transparently, queues
//! outbound messages across disconnects, and dispatches inbound messages
//! to per-channel handlers.
//!
//! # Architecture
//!
//! - **Wire format**: every text frame is `<channel>,<payload>`; only the
//!   first comma is structural
//! - **Event loop**: each [`Client`] owns one tokio task; all state changes
//!   and handler calls happen there, so no handler runs concurrently with
//!   another handler of the same client
//! - **Reconnection**: unclean closures retry with exponential backoff
//!   (x1.25 per attempt, capped at 60 s, no attempt limit)
//! - **Status channel**: the empty channel is the catch-all for
//!   unregistered channels and also receives the client's own
//!   `{"error": bool, "message": string}` lifecycle records
//!
//! # Quick Start
//!
//! ```no_run
//! use wsmux::{Client, Result, Status};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .uri("wss://example.com/ws/session")
//!         .retry_delay(1.0)
//!         .build()?;
//!
//!     client.register("", |channel, payload| {
//!         match Status::from_payload(payload) {
//!             Some(status) if channel.is_empty() => println!("[status] {}", status.message),
//!             _ => println!("[{channel}] {payload}"),
//!         }
//!         Ok(())
//!     });
//!
//!     client.start()?;
//!     client.send("chat", "hello, everyone")?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], builder, dispatch table, queue |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Frame codec and status records |
//! | [`transport`] | WebSocket connection tasks and backoff |

// ============================================================================
// Modules
// ============================================================================

/// Multiplexing client.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers for clients and connections.
pub mod identifiers;

/// Wire protocol: channel frames and status records.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    Client, ClientBuilder, ClientConfig, ClientStatus, Handler, HandlerResult, WeakClient,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ClientId, ConnectionId};

// Protocol types
pub use protocol::{Frame, Status};

// Transport types
pub use transport::{Connector, ReadyState, WsConnector};
