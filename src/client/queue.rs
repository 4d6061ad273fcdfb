//! Outbound frame queue.
//!
//! Holds framed messages composed while no connection is writable. The
//! queue is unbounded; while disconnected it grows without limit.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::collections::vec_deque::Drain;

use crate::protocol::frame;

// ============================================================================
// OutboundQueue
// ============================================================================

/// FIFO of already-framed messages awaiting a writable connection.
#[derive(Debug, Default, Clone)]
pub struct OutboundQueue {
    frames: VecDeque<String>,
}

impl OutboundQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames `payload` for `channel` and appends it.
    pub fn push(&mut self, channel: &str, payload: &str) {
        self.frames.push_back(frame::encode(channel, payload));
    }

    /// Removes and yields every queued frame, oldest first.
    pub fn drain(&mut self) -> Drain<'_, String> {
        self.frames.drain(..)
    }

    /// Number of queued frames.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
