//! Wire protocol types.
//!
//! This module defines what travels over the single underlying connection.
//!
//! # Protocol Overview
//!
//! | Item | Direction | Form |
//! |------|-----------|------|
//! | Channel frame | Both | `<channel>,<payload>` text message |
//! | Probe frame | Client → Server | `,{}` sent on open when nothing is queued |
//! | Status record | Client-local | JSON `{error, message}` on the empty channel |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Channel frame codec |
//! | `status` | Status record carried on the empty channel |

// ============================================================================
// Submodules
// ============================================================================

/// Channel frame codec.
pub mod frame;

/// Status records for the empty channel.
pub mod status;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{Frame, PROBE_FRAME, SEPARATOR, STATUS_CHANNEL, encode};
pub use status::Status;
