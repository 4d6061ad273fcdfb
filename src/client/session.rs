//! Connection state machine.
//!
//! [`Session`] owns everything a client mutates: the current connection
//! handle, the ready flag, the retry policy, the outbound queue, and the
//! status reporter. It is plain synchronous code driven by the event loop
//! in [`super::core`]; the only asynchronous thing it does itself is
//! schedule the retry timer.
//!
//! # Lifecycle
//!
//! ```text
//!            start/send                 Open
//!   (none) ────────────► Connecting ───────────► Open
//!      ▲                     │                    │ close()
//!      │     Close event     ▼                    ▼
//!      └──────────────── (discard) ◄──────────  Closing
//! ```
//!
//! An unclean close schedules a `Retry` command after the backoff delay,
//! provided retry is enabled. `close()` disables retry synchronously so a
//! pending timer cannot resurrect the connection.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::error::Error;
use crate::identifiers::{ClientId, ConnectionId};
use crate::protocol::{Frame, PROBE_FRAME, STATUS_CHANNEL, Status};
use crate::transport::{
    Backoff, CLOSE_NORMAL, CloseInfo, Connector, ORDERLY_SHUTDOWN, Outbound, OutboundSender,
    ReadyState, SocketEnvelope, SocketEvent, SocketEvents,
};

use super::builder::ClientConfig;
use super::dispatch::Dispatcher;
use super::queue::OutboundQueue;

// ============================================================================
// Command
// ============================================================================

/// Requests posted to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Begin connecting; re-arms automatic retry.
    Start,
    /// Queue a frame and try to drain.
    Send {
        /// Target channel.
        channel: String,
        /// Opaque payload.
        payload: String,
    },
    /// Graceful shutdown of the current connection.
    Close,
    /// Fired by the backoff timer.
    Retry,
}

// ============================================================================
// ClientStatus
// ============================================================================

/// Point-in-time view of a client's connection state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientStatus {
    /// Whether the current connection has opened.
    pub ready: bool,
    /// State of the current handle, or `Closed` when there is none.
    pub ready_state: ReadyState,
    /// Current connection handle, if any.
    pub connection: Option<ConnectionId>,
    /// Frames waiting for a writable connection.
    pub queued: usize,
    /// Whether unclean closures schedule a reconnect.
    pub retry_enabled: bool,
    /// Delay the most recent (or next) reconnect uses.
    pub retry_delay: Duration,
}

impl Default for ClientStatus {
    fn default() -> Self {
        Self {
            ready: false,
            ready_state: ReadyState::Closed,
            connection: None,
            queued: 0,
            retry_enabled: false,
            retry_delay: Duration::ZERO,
        }
    }
}

// ============================================================================
// Socket
// ============================================================================

/// The client's view of one connection handle.
#[derive(Debug)]
struct Socket {
    id: ConnectionId,
    state: ReadyState,
    outbound: OutboundSender,
}

impl Socket {
    /// Best-effort write. A frame lost here is not re-queued.
    fn write(&self, frame: String) {
        trace!(connection = %self.id, len = frame.len(), "Frame written");
        if self.outbound.send(Outbound::Text(frame)).is_err() {
            warn!(connection = %self.id, "Connection task gone, frame dropped");
        }
    }

    fn close(&mut self, code: u16, reason: &str) {
        self.state = ReadyState::Closing;
        let _ = self.outbound.send(Outbound::Close {
            code,
            reason: reason.to_owned(),
        });
    }
}

// ============================================================================
// Session
// ============================================================================

/// State owned by a client's event loop.
pub(crate) struct Session {
    client: ClientId,
    config: ClientConfig,
    connector: Arc<dyn Connector>,

    /// At most one live handle; replaced wholesale, never reused.
    socket: Option<Socket>,
    last_connection: ConnectionId,

    ready: bool,
    retry_enabled: bool,
    backoff: Backoff,
    queue: OutboundQueue,
    dispatcher: Dispatcher,
    uri_error_reported: bool,

    events: mpsc::UnboundedSender<SocketEnvelope>,
    commands: mpsc::WeakUnboundedSender<Command>,
    status: Arc<RwLock<ClientStatus>>,
}

impl Session {
    pub(crate) fn new(
        client: ClientId,
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        dispatcher: Dispatcher,
        events: mpsc::UnboundedSender<SocketEnvelope>,
        commands: mpsc::WeakUnboundedSender<Command>,
        status: Arc<RwLock<ClientStatus>>,
    ) -> Self {
        let session = Self {
            client,
            retry_enabled: config.retry,
            backoff: Backoff::new(config.retry_delay),
            config,
            connector,
            socket: None,
            last_connection: ConnectionId::new(0),
            ready: false,
            queue: OutboundQueue::new(),
            dispatcher,
            uri_error_reported: false,
            events,
            commands,
            status,
        };
        session.publish();
        session
    }

    // ========================================================================
    // Entry Points
    // ========================================================================

    /// Applies one command from the client handle or the retry timer.
    pub(crate) fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Send { channel, payload } => self.send(&channel, &payload),
            Command::Close => self.close(),
            Command::Retry => self.retry(),
        }
        self.publish();
    }

    /// Applies one lifecycle event from a connection task.
    pub(crate) fn handle_socket_event(&mut self, envelope: SocketEnvelope) {
        let current = self.socket.as_ref().map(|socket| socket.id);
        if current != Some(envelope.connection) {
            debug!(
                client = %self.client,
                connection = %envelope.connection,
                "Event from discarded connection ignored"
            );
            return;
        }

        match envelope.event {
            SocketEvent::Open => self.on_open(),
            SocketEvent::Message(text) => self.on_message(&text),
            SocketEvent::Error(detail) => self.on_error(&detail),
            SocketEvent::Close(info) => self.on_close(info),
        }
        self.publish();
    }

    /// Drops the current connection without retry. Called when the event
    /// loop ends.
    pub(crate) fn shutdown(&mut self) {
        self.retry_enabled = false;
        if let Some(mut socket) = self.socket.take() {
            debug!(client = %self.client, connection = %socket.id, "Client dropped, closing connection");
            socket.close(CLOSE_NORMAL, ORDERLY_SHUTDOWN);
        }
        self.ready = false;
        self.publish();
    }

    // ========================================================================
    // Operations
    // ========================================================================

    fn start(&mut self) {
        self.retry_enabled = self.config.retry;
        self.acquire_socket();
    }

    fn send(&mut self, channel: &str, payload: &str) {
        self.queue.push(channel, payload);
        self.drain_queue();
    }

    fn close(&mut self) {
        self.retry_enabled = false;
        if self.socket.is_none() {
            return;
        }

        self.drain_queue();
        if let Some(socket) = self.socket.as_mut() {
            info!(client = %self.client, connection = %socket.id, "Closing connection");
            socket.close(CLOSE_NORMAL, ORDERLY_SHUTDOWN);
        }
    }

    fn retry(&mut self) {
        if self.retry_enabled {
            debug!(client = %self.client, "Retrying connection");
            self.acquire_socket();
        } else {
            debug!(client = %self.client, "Retry suppressed");
        }
    }

    /// Writes every queued frame if the connection is open.
    fn drain_queue(&mut self) {
        if !self.acquire_socket() {
            trace!(client = %self.client, queued = self.queue.len(), "Not writable, frames kept");
            return;
        }

        if let Some(socket) = self.socket.as_ref() {
            for frame in self.queue.drain() {
                socket.write(frame);
            }
        }
    }

    /// Returns `true` if an open connection is available, constructing a
    /// new handle when there is none.
    ///
    /// A handle that is still connecting or already closing is left alone,
    /// so there is never more than one in flight.
    fn acquire_socket(&mut self) -> bool {
        if let Some(socket) = &self.socket {
            return socket.state.is_open();
        }

        let Some(uri) = self.config.uri.clone() else {
            if !self.uri_error_reported {
                self.uri_error_reported = true;
                error!(client = %self.client, "No WebSocket URI specified");
                self.report("No WebSocket URI specified", true);
            }
            return false;
        };

        let id = self.last_connection.next();
        self.last_connection = id;

        match self
            .connector
            .connect(&uri, SocketEvents::new(id, self.events.clone()))
        {
            Ok(outbound) => {
                debug!(client = %self.client, connection = %id, "Connection handle created");
                self.socket = Some(Socket {
                    id,
                    state: ReadyState::Connecting,
                    outbound,
                });
            }
            Err(e) => {
                warn!(client = %self.client, error = %e, "Connection construction failed");
                let message = match e {
                    Error::Connection { .. } => e.to_string(),
                    _ => format!("Connection failed: {e}"),
                };
                self.report(message, true);
                self.trigger_retry();
            }
        }

        false
    }

    // ========================================================================
    // Lifecycle Events
    // ========================================================================

    fn on_open(&mut self) {
        self.backoff.reset();
        self.ready = true;

        let Some(socket) = self.socket.as_mut() else {
            return;
        };
        socket.state = ReadyState::Open;
        info!(client = %self.client, connection = %socket.id, queued = self.queue.len(), "Connection established");

        if self.queue.is_empty() {
            socket.write(PROBE_FRAME.to_owned());
        } else {
            self.drain_queue();
        }

        self.report("Connection established", false);
    }

    fn on_message(&mut self, text: &str) {
        match Frame::decode(text) {
            Ok(frame) => {
                self.dispatcher.dispatch(frame.channel, frame.payload);
            }
            Err(e) => {
                warn!(client = %self.client, frame = %text, "Frame without channel indicator dropped");
                self.report(e.to_string(), true);
            }
        }
    }

    fn on_error(&mut self, detail: &str) {
        warn!(client = %self.client, error = %detail, "Transport error");
        self.report(format!("WebSocket error: {detail}"), true);
    }

    fn on_close(&mut self, info: CloseInfo) {
        if info.was_clean {
            info!(client = %self.client, code = info.code, "Connection closed");
            self.report("Connection closed", false);
        } else {
            let verb = if self.ready { "lost" } else { "failed" };
            warn!(client = %self.client, code = info.code, reason = %info.reason, "Connection {verb}");
            self.report(format!("Connection {verb} {} {}", info.code, info.reason), true);
            self.trigger_retry();
        }

        self.ready = false;
        self.socket = None;
    }

    // ========================================================================
    // Retry & Reporting
    // ========================================================================

    /// Schedules a `Retry` command after the next backoff delay.
    fn trigger_retry(&mut self) {
        if !self.retry_enabled {
            return;
        }

        let delay = self.backoff.next_delay();
        info!(
            client = %self.client,
            delay_ms = delay.as_millis() as u64,
            "Reconnect scheduled"
        );

        let commands = self.commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(Command::Retry);
            }
        });
    }

    /// Delivers a status record through the ordinary dispatch path on the
    /// empty channel.
    fn report(&self, message: impl Into<String>, is_error: bool) {
        let status = Status {
            error: is_error,
            message: message.into(),
        };

        match status.to_payload() {
            Ok(payload) => {
                self.dispatcher.dispatch(STATUS_CHANNEL, &payload);
            }
            Err(e) => error!(client = %self.client, error = %e, "Status not serializable"),
        }
    }

    /// Refreshes the snapshot readable from client handles.
    fn publish(&self) {
        let snapshot = ClientStatus {
            ready: self.ready,
            ready_state: self
                .socket
                .as_ref()
                .map_or(ReadyState::Closed, |socket| socket.state),
            connection: self.socket.as_ref().map(|socket| socket.id),
            queued: self.queue.len(),
            retry_enabled: self.retry_enabled,
            retry_delay: self.backoff.current(),
        };
        *self.status.write() = snapshot;
    }
}

// ============================================================================
// Tests
// ============================================================================
