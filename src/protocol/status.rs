//! Transport status records.
//!
//! The client narrates its own lifecycle on the reserved empty channel as
//! a small JSON object:
//!
//! ```json
//! { "error": true, "message": "Connection lost 1006 " }
//! ```
//!
//! Server-originated traffic on the empty channel is application-defined,
//! so both keys are optional when parsing.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Status
// ============================================================================

/// A status or error notification delivered on the empty channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Status {
    /// Whether this record describes a failure.
    #[serde(default)]
    pub error: bool,

    /// Human-readable description.
    #[serde(default)]
    pub message: String,
}

impl Status {
    /// Creates an error record.
    #[inline]
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }

    /// Creates a non-error progress record.
    #[inline]
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
        }
    }

    /// Serializes the record as an empty-channel payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an empty-channel payload.
    ///
    /// Returns `None` for payloads that are not a JSON object, which is
    /// normal for application-defined server traffic.
    #[must_use]
    pub fn from_payload(payload: &str) -> Option<Self> {
        serde_json::from_str(payload).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
