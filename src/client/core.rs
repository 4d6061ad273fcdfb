//! Client handle and event loop.
//!
//! A [`Client`] is a cheap, cloneable handle. Building one spawns a single
//! tokio task that owns the connection state machine; every operation on
//! the handle is a non-blocking message to that task, except handler
//! registration, which writes the shared handler table directly.
//!
//! The event loop runs until the last [`Client`] is dropped, at which point
//! the current connection is closed without retry. Handlers are owned by the
//! loop, so a handler that captures a [`Client`] keeps it running forever;
//! handlers that need to talk back to their client capture a [`WeakClient`]
//! from [`Client::downgrade()`] instead.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::ClientId;
use crate::transport::{Connector, SocketEnvelope};

use super::builder::{ClientBuilder, ClientConfig};
use super::dispatch::{Dispatcher, Handler, HandlerResult, WeakDispatcher};
use super::session::{ClientStatus, Command, Session};

// ============================================================================
// Client
// ============================================================================

/// Handle to one multiplexed, auto-reconnecting connection.
///
/// # Example
///
/// ```no_run
/// use wsmux::{Client, Status};
///
/// # async fn example() -> wsmux::Result<()> {
/// let client = Client::builder().uri("wss://example.com/ws").build()?;
///
/// // Catch-all: unregistered channels and transport status.
/// client.register("", |channel, payload| {
///     if channel.is_empty() {
///         if let Some(status) = Status::from_payload(payload) {
///             println!("status: {}", status.message);
///         }
///     }
///     Ok(())
/// });
///
/// client.register("chat", |_, payload| {
///     println!("chat: {payload}");
///     Ok(())
/// });
///
/// client.start()?;
/// client.send("chat", "hello")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    id: ClientId,
    commands: mpsc::UnboundedSender<Command>,
    dispatcher: Dispatcher,
    status: Arc<RwLock<ClientStatus>>,
}

impl Client {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from a configuration.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is out of range.
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build()
    }

    /// Spawns the event loop for a validated configuration.
    pub(crate) fn spawn(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let id = ClientId::generate();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new();
        let status = Arc::new(RwLock::new(ClientStatus::default()));

        debug!(client = %id, uri = ?config.uri, retry = config.retry, "Client created");

        let session = Session::new(
            id,
            config,
            connector,
            dispatcher.clone(),
            event_tx,
            command_tx.downgrade(),
            Arc::clone(&status),
        );

        tokio::spawn(run_event_loop(id, session, command_rx, event_rx));

        Self {
            id,
            commands: command_tx,
            dispatcher,
            status,
        }
    }

    /// Returns this client's ID.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.id
    }

    /// Begins connecting. Idempotent.
    ///
    /// Re-enables automatic retry if it is configured and was disabled by
    /// [`close()`](Self::close).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientStopped`] if the event loop has ended.
    pub fn start(&self) -> Result<()> {
        self.post(Command::Start)
    }

    /// Queues `payload` for `channel` and transmits it as soon as the
    /// connection is open.
    ///
    /// Connects implicitly if no connection exists yet. Frames queued while
    /// disconnected are sent in order on the next successful open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientStopped`] if the event loop has ended.
    pub fn send(&self, channel: impl Into<String>, payload: impl Into<String>) -> Result<()> {
        self.post(Command::Send {
            channel: channel.into(),
            payload: payload.into(),
        })
    }

    /// Closes the connection gracefully (code 1000, "Orderly shutdown").
    ///
    /// Queued frames are flushed first if the connection is open. Automatic
    /// retry is disabled until the next [`start()`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientStopped`] if the event loop has ended.
    pub fn close(&self) -> Result<()> {
        self.post(Command::Close)
    }

    /// Registers `handler` for `channel`, replacing any existing one.
    ///
    /// Registering for `""` installs the catch-all, which also receives the
    /// client's own status records.
    pub fn register<F>(&self, channel: &str, handler: F)
    where
        F: Fn(&str, &str) -> HandlerResult + Send + Sync + 'static,
    {
        self.dispatcher.set(channel, Some(Arc::new(handler)));
    }

    /// Removes the handler for `channel`.
    pub fn unregister(&self, channel: &str) {
        self.dispatcher.set(channel, None);
    }

    /// Installs or clears (`None`) the handler for `channel`.
    pub fn set_handler(&self, channel: &str, handler: Option<Handler>) {
        self.dispatcher.set(channel, handler);
    }

    /// Returns a handle that does not keep the event loop alive.
    ///
    /// Capture this in handlers that send on or close their own client.
    #[must_use]
    pub fn downgrade(&self) -> WeakClient {
        WeakClient {
            id: self.id,
            commands: self.commands.downgrade(),
            dispatcher: self.dispatcher.downgrade(),
            status: Arc::downgrade(&self.status),
        }
    }

    /// Returns a snapshot of the connection state.
    #[must_use]
    pub fn status(&self) -> ClientStatus {
        self.status.read().clone()
    }

    /// Returns `true` if the connection is open.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.read().ready
    }

    fn post(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::ClientStopped)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("status", &*self.status.read())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WeakClient
// ============================================================================

/// Non-owning [`Client`] handle.
///
/// Does not count toward the handles that keep the event loop running.
#[derive(Clone)]
pub struct WeakClient {
    id: ClientId,
    commands: mpsc::WeakUnboundedSender<Command>,
    dispatcher: WeakDispatcher,
    status: Weak<RwLock<ClientStatus>>,
}

impl WeakClient {
    /// Returns the ID of the client this handle refers to.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.id
    }

    /// Returns a [`Client`] if at least one strong handle is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Client> {
        Some(Client {
            id: self.id,
            commands: self.commands.upgrade()?,
            dispatcher: self.dispatcher.upgrade()?,
            status: self.status.upgrade()?,
        })
    }
}

impl std::fmt::Debug for WeakClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakClient")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Serializes commands and connection events onto one task.
async fn run_event_loop(
    id: ClientId,
    mut session: Session,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    mut event_rx: mpsc::UnboundedReceiver<SocketEnvelope>,
) {
    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(command) => session.handle_command(command),
                None => {
                    debug!(client = %id, "All client handles dropped");
                    break;
                }
            },

            // The session holds a sender, so this never yields `None`.
            Some(envelope) = event_rx.recv() => session.handle_socket_event(envelope),
        }
    }

    session.shutdown();
    info!(client = %id, "Event loop terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;

    use crate::protocol::Status;
    use crate::transport::ReadyState;

    const WAIT: Duration = Duration::from_secs(5);

    /// Forwards every `(channel, payload)` a handler sees.
    fn forwarder(tx: mpsc::UnboundedSender<(String, String)>) -> Handler {
        Arc::new(move |channel: &str, payload: &str| -> HandlerResult {
            let _ = tx.send((channel.to_owned(), payload.to_owned()));
            Ok(())
        })
    }

    async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
        timeout(WAIT, rx.recv())
            .await
            .expect("value in time")
            .expect("channel open")
    }

    async fn next_status(rx: &mut mpsc::UnboundedReceiver<(String, String)>) -> Status {
        loop {
            let (channel, payload) = next(rx).await;
            if channel.is_empty()
                && let Some(status) = Status::from_payload(&payload)
            {
                return status;
            }
        }
    }

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        (listener, format!("ws://127.0.0.1:{port}"))
    }

    #[tokio::test]
    async fn test_queued_send_delivered_on_open() {
        let (listener, uri) = bind().await;
        let (server_tx, mut server_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = server_tx.send(text.as_str().to_owned());
            }
        });

        let client = Client::builder().uri(uri).build().expect("build");
        client.send("log", "hello").expect("send");
        client.start().expect("start");

        assert_eq!(next(&mut server_rx).await, "log,hello");

        client.send("log", "again").expect("send");
        assert_eq!(next(&mut server_rx).await, "log,again");
        assert!(client.is_ready());
    }

    #[tokio::test]
    async fn test_routes_server_frames_and_reports_status() {
        let (listener, uri) = bind().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");

            // Probe from an idle client.
            let probe = ws.next().await.expect("frame").expect("ok");
            assert_eq!(probe, Message::Text(",{}".into()));

            for frame in ["chat,hi", "news,extra,commas", "garbage"] {
                ws.send(Message::Text(frame.into())).await.expect("send");
            }
            while ws.next().await.is_some() {}
        });

        let client = Client::builder().uri(uri).build().expect("build");
        let (all_tx, mut all_rx) = mpsc::unbounded_channel();
        let (chat_tx, mut chat_rx) = mpsc::unbounded_channel();
        client.set_handler("", Some(forwarder(all_tx)));
        client.set_handler("chat", Some(forwarder(chat_tx)));

        client.start().expect("start");

        assert_eq!(
            next_status(&mut all_rx).await,
            Status::info("Connection established")
        );
        assert_eq!(next(&mut chat_rx).await, ("chat".into(), "hi".into()));
        assert_eq!(
            next(&mut all_rx).await,
            ("news".into(), "extra,commas".into())
        );

        let status = next_status(&mut all_rx).await;
        assert!(status.error);
        assert!(status.message.starts_with("Invalid message from server"));
    }

    #[tokio::test]
    async fn test_reconnects_after_abrupt_disconnect() {
        let (listener, uri) = bind().await;
        let (server_tx, mut server_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            // First connection: read the probe, then drop the TCP stream
            // without a closing handshake.
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            let _ = ws.next().await;
            drop(ws);

            // Second connection stays up and reports what it receives.
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = server_tx.send(text.as_str().to_owned());
            }
        });

        let client = Client::builder()
            .uri(uri)
            .retry_delay(0.05)
            .build()
            .expect("build");
        let (all_tx, mut all_rx) = mpsc::unbounded_channel();
        client.set_handler("", Some(forwarder(all_tx)));
        client.start().expect("start");

        assert_eq!(
            next_status(&mut all_rx).await,
            Status::info("Connection established")
        );

        let lost = next_status(&mut all_rx).await;
        let lost = if lost.message.starts_with("WebSocket error") {
            next_status(&mut all_rx).await
        } else {
            lost
        };
        assert!(lost.error);
        assert!(lost.message.starts_with("Connection lost 1006"), "{lost:?}");

        assert_eq!(
            next_status(&mut all_rx).await,
            Status::info("Connection established")
        );
        assert_eq!(next(&mut server_rx).await, ",{}");
    }

    #[tokio::test]
    async fn test_close_is_orderly_and_final() {
        let (listener, uri) = bind().await;
        let (close_tx, mut close_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Close(Some(frame)) = message {
                    let _ = close_tx.send((u16::from(frame.code), frame.reason.as_str().to_owned()));
                }
            }
        });

        let client = Client::builder().uri(uri).build().expect("build");
        let (all_tx, mut all_rx) = mpsc::unbounded_channel();
        client.set_handler("", Some(forwarder(all_tx)));
        client.start().expect("start");

        assert_eq!(
            next_status(&mut all_rx).await,
            Status::info("Connection established")
        );

        client.close().expect("close");
        assert_eq!(
            next(&mut close_rx).await,
            (1000, "Orderly shutdown".to_owned())
        );
        assert_eq!(
            next_status(&mut all_rx).await,
            Status::info("Connection closed")
        );

        let status = client.status();
        assert!(!status.ready);
        assert!(!status.retry_enabled);
        assert_eq!(status.ready_state, ReadyState::Closed);
    }

    #[tokio::test]
    async fn test_handler_with_weak_handle_does_not_pin_event_loop() {
        let (listener, uri) = bind().await;
        let (server_tx, mut server_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            let _probe = ws.next().await;
            ws.send(Message::Text("ping,1".into())).await.expect("send");
            while let Some(Ok(message)) = ws.next().await {
                match message {
                    Message::Text(text) => {
                        let _ = server_tx.send(text.as_str().to_owned());
                    }
                    Message::Close(Some(frame)) => {
                        let _ = server_tx.send(format!(
                            "close {} {}",
                            u16::from(frame.code),
                            frame.reason.as_str()
                        ));
                    }
                    _ => {}
                }
            }
        });

        let client = Client::builder().uri(uri).build().expect("build");
        let weak = client.downgrade();
        let replier = weak.clone();
        client.register("ping", move |_, payload| {
            if let Some(client) = replier.upgrade() {
                client.send("pong", payload)?;
            }
            Ok(())
        });
        client.start().expect("start");

        assert_eq!(next(&mut server_rx).await, "pong,1");
        assert!(weak.upgrade().is_some());

        drop(client);
        assert_eq!(next(&mut server_rx).await, "close 1000 Orderly shutdown");
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_missing_uri_is_reported_not_fatal() {
        let client = Client::builder().build().expect("build");
        let (all_tx, mut all_rx) = mpsc::unbounded_channel();
        client.set_handler("", Some(forwarder(all_tx)));

        tokio_test::assert_ok!(client.start());
        let status = next_status(&mut all_rx).await;
        assert_eq!(status, Status::error("No WebSocket URI specified"));
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let a = Client::builder().build().expect("build");
        let b = Client::builder().build().expect("build");
        assert_ne!(a.id(), b.id());

        a.register("chat", |_, _| Ok(()));
        assert!(a.dispatcher.contains("chat"));
        assert!(!b.dispatcher.contains("chat"));

        a.unregister("chat");
        assert!(!a.dispatcher.contains("chat"));
    }
}
