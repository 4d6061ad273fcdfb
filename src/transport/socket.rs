//! Underlying WebSocket connection and its lifecycle events.
//!
//! A connection is driven by its own tokio task. The task never touches
//! client state: it reports `Open`, `Message`, `Error` and `Close` events,
//! tagged with the connection's [`ConnectionId`], to the client's event
//! loop, and accepts outbound text and close requests on an unbounded
//! channel.
//!
//! # Close Semantics
//!
//! | Situation | Clean | Code |
//! |-----------|-------|------|
//! | Server sends a close frame | yes | frame code, or 1005 |
//! | Local `close()` completes | yes | 1000 |
//! | Stream ends or errors without handshake | no | 1006 |
//! | Connect fails | no | 1006 |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

// ============================================================================
// Constants
// ============================================================================

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// No status code was present in the close frame.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Connection dropped without a closing handshake.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Reason sent with an explicit client close.
pub const ORDERLY_SHUTDOWN: &str = "Orderly shutdown";

// ============================================================================
// ReadyState
// ============================================================================

/// Lifecycle state of a connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting,
    /// Writable.
    Open,
    /// Close requested, waiting for the stream to finish.
    Closing,
    /// Terminal. A closed handle is discarded, never reused.
    Closed,
}

impl ReadyState {
    /// Returns `true` if frames can be written.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Events
// ============================================================================

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// Close code (RFC 6455).
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
    /// Whether the closing handshake completed.
    pub was_clean: bool,
}

impl CloseInfo {
    /// A clean closure with the given code and reason.
    #[must_use]
    pub fn clean(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// An abnormal closure (code 1006).
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: CLOSE_ABNORMAL,
            reason: reason.into(),
            was_clean: false,
        }
    }
}

/// A lifecycle event reported by a connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Handshake completed; the connection is writable.
    Open,
    /// A text message arrived.
    Message(String),
    /// A transport-level error occurred. Always followed by `Close`.
    Error(String),
    /// The connection reached its terminal state.
    Close(CloseInfo),
}

/// A [`SocketEvent`] tagged with the connection that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEnvelope {
    /// Source connection.
    pub connection: ConnectionId,
    /// The event.
    pub event: SocketEvent,
}

/// Sending side of a connection's event stream.
#[derive(Debug, Clone)]
pub struct SocketEvents {
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<SocketEnvelope>,
}

impl SocketEvents {
    /// Creates an event sink for `connection`.
    #[must_use]
    pub fn new(connection: ConnectionId, tx: mpsc::UnboundedSender<SocketEnvelope>) -> Self {
        Self { connection, tx }
    }

    /// Returns the connection this sink reports for.
    #[inline]
    #[must_use]
    pub const fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Reports an event. Dropped silently if the client is gone.
    pub fn emit(&self, event: SocketEvent) {
        let _ = self.tx.send(SocketEnvelope {
            connection: self.connection,
            event,
        });
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Requests from the client to a connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write one text frame.
    Text(String),
    /// Start the closing handshake.
    Close {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// Client-side handle to a connection task.
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

// ============================================================================
// Connector
// ============================================================================

/// Constructs underlying connections.
///
/// `connect` must not block: it validates the target synchronously and
/// hands the handshake to a background task that reports progress through
/// `events`. A synchronous `Err` means the handle could not be built at
/// all; the client reports it and schedules a retry.
pub trait Connector: Send + Sync + 'static {
    /// Starts a connection to `uri`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be constructed.
    fn connect(&self, uri: &str, events: SocketEvents) -> Result<OutboundSender>;
}

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, uri: &str, events: SocketEvents) -> Result<OutboundSender> {
        let request = client_request(uri)?;
        let (tx, rx) = mpsc::unbounded_channel();

        debug!(connection = %events.connection(), %uri, "Connecting");
        tokio::spawn(run_socket(request, rx, events));

        Ok(tx)
    }
}

/// Validates `uri` and builds the handshake request.
fn client_request(uri: &str) -> Result<Request> {
    let url = Url::parse(uri)?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(Error::connection(format!(
            "unsupported scheme {:?}, expected ws or wss",
            url.scheme()
        )));
    }

    Ok(url.as_str().into_client_request()?)
}

// ============================================================================
// Connection Task
// ============================================================================

/// Drives one WebSocket connection until it closes.
async fn run_socket(
    request: Request,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: SocketEvents,
) {
    let connect = connect_async(request);
    tokio::pin!(connect);

    // A close request or a dropped handle during the handshake aborts it.
    let ws_stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((ws_stream, _)) => break ws_stream,
                Err(e) => {
                    events.emit(SocketEvent::Error(e.to_string()));
                    events.emit(SocketEvent::Close(CloseInfo::abnormal("")));
                    return;
                }
            },
            request = outbound.recv() => match request {
                Some(Outbound::Text(_)) => {
                    warn!(connection = %events.connection(), "Write before open, frame dropped");
                }
                Some(Outbound::Close { .. }) | None => {
                    debug!(connection = %events.connection(), "Connect aborted");
                    events.emit(SocketEvent::Close(CloseInfo::abnormal("")));
                    return;
                }
            },
        }
    };

    events.emit(SocketEvent::Open);

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut close_info: Option<CloseInfo> = None;
    let mut closing = false;
    let mut handle_dropped = false;

    loop {
        tokio::select! {
            message = ws_read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    trace!(connection = %events.connection(), len = text.len(), "Frame received");
                    events.emit(SocketEvent::Message(text.as_str().to_owned()));
                }

                Some(Ok(Message::Close(frame))) => {
                    let info = match frame {
                        Some(frame) => CloseInfo::clean(u16::from(frame.code), frame.reason.as_str()),
                        None => CloseInfo::clean(CLOSE_NO_STATUS, ""),
                    };
                    debug!(connection = %events.connection(), code = info.code, "Close frame received");
                    close_info = Some(info);
                }

                Some(Err(e)) => {
                    if closing || close_info.is_some() {
                        debug!(connection = %events.connection(), error = %e, "Error after close");
                    } else {
                        events.emit(SocketEvent::Error(e.to_string()));
                        close_info = Some(CloseInfo::abnormal(""));
                    }
                    break;
                }

                None => break,

                // Binary, Ping, Pong, Frame
                _ => {}
            },

            request = outbound.recv(), if !handle_dropped => match request {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                        warn!(connection = %events.connection(), error = %e, "Write failed, frame dropped");
                    }
                }

                Some(Outbound::Close { code, reason }) => {
                    closing = true;
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
                        debug!(connection = %events.connection(), error = %e, "Close frame not sent");
                    }
                }

                None => {
                    // The client discarded this handle; finish quietly.
                    handle_dropped = true;
                    closing = true;
                    let _ = ws_write.close().await;
                }
            },
        }
    }

    let info = close_info.unwrap_or_else(|| {
        if closing {
            CloseInfo::clean(CLOSE_NORMAL, ORDERLY_SHUTDOWN)
        } else {
            CloseInfo::abnormal("")
        }
    });

    events.emit(SocketEvent::Close(info));
}

// ============================================================================
// Tests
// ============================================================================
