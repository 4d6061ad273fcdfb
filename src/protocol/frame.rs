//! Channel frame codec.
//!
//! Every text message on the wire is one frame:
//!
//! ```text
//! <channel>,<payload>
//! ```
//!
//! `<channel>` is zero or more non-comma characters. `<payload>` is the
//! rest of the message and may contain commas of its own; only the first
//! comma is structural. The empty channel is reserved for catch-all
//! traffic and transport status records.

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Separator between channel and payload.
pub const SEPARATOR: char = ',';

/// The reserved catch-all / status channel.
pub const STATUS_CHANNEL: &str = "";

/// Frame sent on open when nothing is queued, so the server can recognize
/// the session.
pub const PROBE_FRAME: &str = ",{}";

// ============================================================================
// Frame
// ============================================================================

/// A decoded frame borrowing from the received text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Channel name (may be empty).
    pub channel: &'a str,
    /// Opaque payload (may be empty, may contain commas).
    pub payload: &'a str,
}

impl<'a> Frame<'a> {
    /// Creates a frame view.
    #[inline]
    #[must_use]
    pub const fn new(channel: &'a str, payload: &'a str) -> Self {
        Self { channel, payload }
    }

    /// Splits raw frame text at the first comma.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the text has no separator.
    ///
    /// # Example
    ///
    /// ```
    /// use wsmux::protocol::Frame;
    ///
    /// let frame = Frame::decode("chat,hello, world").unwrap();
    /// assert_eq!(frame.channel, "chat");
    /// assert_eq!(frame.payload, "hello, world");
    /// ```
    pub fn decode(text: &'a str) -> Result<Self> {
        text.split_once(SEPARATOR)
            .map(|(channel, payload)| Self { channel, payload })
            .ok_or_else(|| Error::malformed_frame(text))
    }

    /// Encodes this frame as wire text.
    #[inline]
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self.channel, self.payload)
    }

    /// Returns `true` if the frame targets the reserved empty channel.
    #[inline]
    #[must_use]
    pub fn is_status_channel(&self) -> bool {
        self.channel.is_empty()
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Frames a payload for `channel`.
///
/// Callers are responsible for keeping commas out of channel names; a
/// comma in `channel` would move the split point on the receiving side.
#[must_use]
pub fn encode(channel: &str, payload: &str) -> String {
    let mut frame = String::with_capacity(channel.len() + payload.len() + 1);
    frame.push_str(channel);
    frame.push(SEPARATOR);
    frame.push_str(payload);
    frame
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode("log", "hello"), "log,hello");
        assert_eq!(encode("", "{}"), PROBE_FRAME);
    }

    #[test]
    fn test_decode_splits_at_first_comma() {
        let frame = Frame::decode("chat,a,b,c").expect("decode");
        assert_eq!(frame, Frame::new("chat", "a,b,c"));
    }

    #[test]
    fn test_decode_empty_channel() {
        let frame = Frame::decode(",{\"error\":false}").expect("decode");
        assert!(frame.is_status_channel());
        assert_eq!(frame.payload, "{\"error\":false}");
    }

    #[test]
    fn test_decode_empty_payload() {
        let frame = Frame::decode("news,").expect("decode");
        assert_eq!(frame.channel, "news");
        assert_eq!(frame.payload, "");
    }

    #[test]
    fn test_decode_lone_separator() {
        let frame = Frame::decode(",").expect("decode");
        assert_eq!(frame, Frame::new("", ""));
    }

    #[test]
    fn test_decode_without_separator_is_malformed() {
        let err = Frame::decode("no separator here").unwrap_err();
        assert!(matches!(err, Error::MalformedFrame { ref frame } if frame == "no separator here"));

        assert!(Frame::decode("").is_err());
    }

    #[test]
    fn test_frame_encode_matches_free_function() {
        let frame = Frame::new("a", "b,c");
        assert_eq!(frame.encode(), "a,b,c");
    }

    proptest! {
        #[test]
        fn prop_round_trip(channel in "[^,]{0,16}", payload in ".{0,64}") {
            let text = encode(&channel, &payload);
            let frame = Frame::decode(&text).expect("encoded frame decodes");
            prop_assert_eq!(frame.channel, channel.as_str());
            prop_assert_eq!(frame.payload, payload.as_str());
        }
    }
}
