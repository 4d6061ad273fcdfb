//! Multiplexing client.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Cloneable handle: start, send, register, close |
//! | [`WeakClient`] | Non-owning handle for use inside handlers |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientConfig`] | Serde-loadable construction options |
//! | [`ClientStatus`] | Connection state snapshot |
//! | [`Dispatcher`] | Channel → handler table with catch-all fallback |
//! | [`OutboundQueue`] | Frames awaiting a writable connection |
//!
//! # Data Flow
//!
//! ```text
//! send(channel, payload) ─► queue ─► drain (if open) ─► connection task
//! connection task ─► frame decode ─► Dispatcher ─► handler
//! lifecycle change ─► Status record ─► Dispatcher("") ─► catch-all handler
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Configuration and builder.
pub mod builder;

/// Client handle and event loop.
pub mod core;

/// Channel handler table.
pub mod dispatch;

/// Outbound frame queue.
pub mod queue;

/// Connection state machine.
mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ClientBuilder, ClientConfig};
pub use self::core::{Client, WeakClient};
pub use dispatch::{BoxError, DispatchOutcome, Dispatcher, Handler, HandlerResult};
pub use queue::OutboundQueue;
pub use session::ClientStatus;
