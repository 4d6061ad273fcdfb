//! WebSocket transport layer.
//!
//! This module owns the single physical connection underneath a client:
//! how it is constructed, how its lifecycle is reported, and how long to
//! wait before building a replacement.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   Outbound (Text/Close)   ┌─────────────────┐
//! │  Client event   │──────────────────────────►│  Connection     │◄────► Server
//! │  loop (Session) │◄──────────────────────────│  task           │
//! └─────────────────┘   SocketEvent per id      └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backoff` | Reconnect delay policy |
//! | `socket` | Ready states, lifecycle events, connectors |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect delay policy.
pub mod backoff;

/// Connection tasks and lifecycle events.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::Backoff;
pub use socket::{
    CLOSE_ABNORMAL, CLOSE_NO_STATUS, CLOSE_NORMAL, CloseInfo, Connector, ORDERLY_SHUTDOWN,
    Outbound, OutboundSender, ReadyState, SocketEnvelope, SocketEvent, SocketEvents, WsConnector,
};
