//! Channel handler table.
//!
//! Maps channel names to handlers and resolves inbound frames to one of
//! them. Resolution is an exact match, falling back to the handler
//! registered for the empty channel, which doubles as the catch-all and
//! the place transport status records are delivered.
//!
//! Handlers run on the client's event loop. A handler that returns an
//! error or panics is logged and isolated: dispatch carries on and the
//! connection stays up.

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::protocol::STATUS_CHANNEL;

// ============================================================================
// Types
// ============================================================================

/// Boxed error a handler may return.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Return type of a channel handler.
pub type HandlerResult = std::result::Result<(), BoxError>;

/// Channel handler callback.
///
/// Receives `(channel, payload)`. For the empty channel the payload is
/// either a serialized [`crate::protocol::Status`] or application-defined
/// server traffic.
pub type Handler = Arc<dyn Fn(&str, &str) -> HandlerResult + Send + Sync>;

/// Result of dispatching one message.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A handler ran to completion.
    Delivered,
    /// No handler resolved for the channel.
    Unrouted,
    /// The resolved handler failed.
    Failed(Error),
}

impl DispatchOutcome {
    /// Returns `true` if a handler accepted the message.
    #[inline]
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Shared channel → handler table.
///
/// Cloning yields another view of the same table.
#[derive(Clone, Default)]
pub struct Dispatcher {
    handlers: Arc<RwLock<FxHashMap<String, Handler>>>,
}

impl Dispatcher {
    /// Creates an empty table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view that does not keep the table alive.
    #[inline]
    #[must_use]
    pub(crate) fn downgrade(&self) -> WeakDispatcher {
        WeakDispatcher {
            handlers: Arc::downgrade(&self.handlers),
        }
    }

    /// Installs or clears the handler for `channel`.
    ///
    /// `None` removes any existing entry.
    pub fn set(&self, channel: &str, handler: Option<Handler>) {
        let mut handlers = self.handlers.write();
        match handler {
            Some(handler) => {
                handlers.insert(channel.to_owned(), handler);
                debug!(channel, "Handler registered");
            }
            None => {
                if handlers.remove(channel).is_some() {
                    debug!(channel, "Handler cleared");
                }
            }
        }
    }

    /// Returns the handler that would receive traffic on `channel`.
    #[must_use]
    pub fn handler_for(&self, channel: &str) -> Option<Handler> {
        let handlers = self.handlers.read();
        handlers
            .get(channel)
            .or_else(|| {
                if channel.is_empty() {
                    None
                } else {
                    handlers.get(STATUS_CHANNEL)
                }
            })
            .cloned()
    }

    /// Returns `true` if a handler is registered for exactly `channel`.
    #[must_use]
    pub fn contains(&self, channel: &str) -> bool {
        self.handlers.read().contains_key(channel)
    }

    /// Delivers `payload` to the handler resolved for `channel`.
    ///
    /// The table lock is released before the handler runs, so handlers may
    /// register or clear handlers themselves.
    pub fn dispatch(&self, channel: &str, payload: &str) -> DispatchOutcome {
        let Some(handler) = self.handler_for(channel) else {
            // Endpoints may legitimately get traffic they don't care about.
            debug!(channel, "Unregistered channel");
            return DispatchOutcome::Unrouted;
        };

        trace!(channel, len = payload.len(), "Dispatching");

        let failure = match catch_unwind(AssertUnwindSafe(|| handler(channel, payload))) {
            Ok(Ok(())) => return DispatchOutcome::Delivered,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        warn!(channel, error = %failure, "Handler failed");
        DispatchOutcome::Failed(Error::handler(channel, failure))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let mut channels: Vec<&str> = handlers.keys().map(String::as_str).collect();
        channels.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("channels", &channels)
            .finish()
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

// ============================================================================
// WeakDispatcher
// ============================================================================

/// Non-owning view of a [`Dispatcher`] table.
#[derive(Clone)]
pub(crate) struct WeakDispatcher {
    handlers: Weak<RwLock<FxHashMap<String, Handler>>>,
}

impl WeakDispatcher {
    /// Returns the table if it is still alive.
    #[inline]
    pub(crate) fn upgrade(&self) -> Option<Dispatcher> {
        self.handlers.upgrade().map(|handlers| Dispatcher { handlers })
    }
}

// ============================================================================
// Tests
// ============================================================================
