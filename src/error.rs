//! Error types for wsmux.
//!
//! This module defines all error types used throughout the crate.
//!
//! Most failures inside the transport never reach the caller as an
//! [`Error`]: they are narrated as status records on the reserved empty
//! channel (see [`crate::protocol::Status`]). The enum below is what the
//! crate uses internally to carry those failures around, and what the few
//! fallible public operations return.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUri`] |
//! | Connection | [`Error::Connection`], [`Error::WebSocket`] |
//! | Protocol | [`Error::MalformedFrame`] |
//! | Dispatch | [`Error::Handler`] |
//! | Lifecycle | [`Error::ClientStopped`] |
//! | External | [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid. Never retried.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The target URI could not be parsed.
    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection could not be constructed or was lost.
    ///
    /// Retried with backoff while automatic retry is enabled.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Received frame has no channel separator.
    ///
    /// The frame is dropped; the connection stays up.
    #[error("Invalid message from server, no channel indicator: {frame}")]
    MalformedFrame {
        /// The offending frame text.
        frame: String,
    },

    // ========================================================================
    // Dispatch Errors
    // ========================================================================
    /// A registered handler failed or panicked.
    #[error("Handler for channel {channel:?} failed: {message}")]
    Handler {
        /// Channel the handler was invoked for.
        channel: String,
        /// Failure description.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The client's event loop is no longer running.
    #[error("Client event loop stopped")]
    ClientStopped,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed_frame(frame: impl Into<String>) -> Self {
        Self::MalformedFrame {
            frame: frame.into(),
        }
    }

    /// Creates a handler failure error.
    #[inline]
    pub fn handler(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            channel: channel.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::WebSocket(_))
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry. Configuration problems are
    /// fatal; connection problems are retried with backoff; a malformed
    /// frame or failing handler only affects the message at hand.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::WebSocket(_)
                | Self::MalformedFrame { .. }
                | Self::Handler { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
