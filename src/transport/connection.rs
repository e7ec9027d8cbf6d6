//! Socket.IO connection and event loop.
//!
//! This module owns the single real-time channel: the Engine.IO/Socket.IO
//! handshake, heartbeat, event/ack correlation, inbound event routing, and
//! bounded transport-level reconnection.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming packets from the backend (pings, events, acks)
//! - Outgoing events from the client API
//! - Ack correlation by numeric ack id
//! - Redialing a dropped link a fixed number of times

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

use crate::auth::GuestToken;
use crate::error::{Error, Result};
use crate::protocol::{AuthPayload, DEFAULT_NAMESPACE, EnginePacket, OpenHandshake, SocketPacket};

use super::socket::{Dialer, Socket};
use super::state::ConnectionState;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for dial plus handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for an event acknowledgement.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of redial attempts after the link drops.
pub const DEFAULT_RECONNECTION_ATTEMPTS: u32 = 5;

/// Default fixed delay before each redial attempt.
pub const DEFAULT_RECONNECTION_DELAY: Duration = Duration::from_secs(1);

/// Default maximum pending acknowledgements before rejecting new sends.
pub const DEFAULT_MAX_PENDING_ACKS: usize = 100;

// ============================================================================
// Types
// ============================================================================

/// Map of ack ids to waiting senders.
type AckMap = FxHashMap<u64, oneshot::Sender<Result<Vec<Value>>>>;

/// Inbound event callback.
///
/// Called on the event loop task, once per inbound event, in arrival order.
pub type EventHandler = Box<dyn Fn(InboundEvent) + Send + Sync>;

/// Shared state publisher.
pub type StateSender = Arc<watch::Sender<ConnectionState>>;

// ============================================================================
// InboundEvent
// ============================================================================

/// An event pushed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Event name, e.g. `chat:response`.
    pub name: String,
    /// Arguments following the name.
    pub args: Vec<Value>,
}

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Timing and limits for a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Timeout for dial plus handshake.
    pub handshake_timeout: Duration,
    /// Timeout for each acknowledgement.
    pub ack_timeout: Duration,
    /// Redial attempts after an unexpected drop (0 disables).
    pub reconnection_attempts: u32,
    /// Fixed delay before each redial.
    pub reconnection_delay: Duration,
    /// Maximum in-flight acknowledgements.
    pub max_pending_acks: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            reconnection_attempts: DEFAULT_RECONNECTION_ATTEMPTS,
            reconnection_delay: DEFAULT_RECONNECTION_DELAY,
            max_pending_acks: DEFAULT_MAX_PENDING_ACKS,
        }
    }
}

// ============================================================================
// LoopCommand
// ============================================================================

/// Internal commands for the event loop.
enum LoopCommand {
    /// Send an event frame and route its ack.
    Emit {
        ack_id: u64,
        frame: String,
        ack_tx: oneshot::Sender<Result<Vec<Value>>>,
    },
    /// Remove a timed-out ack entry.
    RemoveAck(u64),
    /// Close the channel.
    Shutdown,
}

/// Why the inner read loop stopped.
enum LinkEnd {
    /// Owner asked to close.
    Shutdown,
    /// Server sent a Socket.IO DISCONNECT or Engine.IO close.
    ServerDisconnect,
    /// Transport dropped or heartbeat expired.
    Lost(String),
}

// ============================================================================
// Connection
// ============================================================================

/// Live Socket.IO channel to the chat backend.
///
/// Cloning yields another handle to the same channel.
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<LoopCommand>,
    /// Ack correlation map (shared with event loop).
    pending: Arc<Mutex<AckMap>>,
    /// Next ack id.
    next_ack: Arc<AtomicU64>,
    /// State publisher (shared with event loop and owner).
    state: StateSender,
    /// Event loop task, taken by [`Connection::close`].
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Timing and limits.
    config: ConnectionConfig,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            pending: Arc::clone(&self.pending),
            next_ack: Arc::clone(&self.next_ack),
            state: Arc::clone(&self.state),
            task: Arc::clone(&self.task),
            config: self.config,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &*self.state.borrow())
            .field("pending", &self.pending.lock().len())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Dials the backend, completes the handshake, and starts the event loop.
    ///
    /// On success the state is [`ConnectionState::Connected`]. A failure
    /// here is not retried.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the socket cannot be opened
    /// - [`Error::ConnectionTimeout`] if the handshake does not finish in time
    /// - [`Error::ConnectRejected`] if the backend refuses the credential
    pub async fn open(
        dialer: Arc<dyn Dialer>,
        token: GuestToken,
        config: ConnectionConfig,
        handler: EventHandler,
        state: StateSender,
    ) -> Result<Self> {
        let (socket, handshake) = dial_and_handshake(dialer.as_ref(), &token, &config).await?;

        info!(sid = %handshake.sid, "Connected to chat backend");
        state.send_replace(ConnectionState::Connected);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(Mutex::new(AckMap::default()));

        let event_loop = EventLoop {
            dialer,
            token,
            config,
            command_rx,
            pending: Arc::clone(&pending),
            handler,
            state: Arc::clone(&state),
        };
        let task = tokio::spawn(event_loop.run(socket, handshake));

        Ok(Self {
            command_tx,
            pending,
            next_ack: Arc::new(AtomicU64::new(0)),
            state,
            task: Arc::new(Mutex::new(Some(task))),
            config,
        })
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Returns `true` if sends are accepted.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    /// Returns the number of unacknowledged events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Emits an event and waits for its acknowledgement.
    ///
    /// Fails immediately unless the channel is connected; nothing is queued.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the channel is not connected
    /// - [`Error::Protocol`] if too many acks are pending
    /// - [`Error::ConnectionClosed`] if the link drops before the ack
    /// - [`Error::AckTimeout`] if no ack arrives within the ack timeout
    pub async fn emit_with_ack(&self, event: &str, payload: Value) -> Result<Vec<Value>> {
        let state = self.state();
        if !state.is_connected() {
            return Err(Error::not_connected(state));
        }

        {
            let pending = self.pending.lock();
            if pending.len() >= self.config.max_pending_acks {
                warn!(
                    pending = pending.len(),
                    max = self.config.max_pending_acks,
                    "Too many pending acknowledgements"
                );
                return Err(Error::protocol(format!(
                    "Too many pending acknowledgements: {}/{}",
                    pending.len(),
                    self.config.max_pending_acks
                )));
            }
        }

        let ack_id = self.next_ack.fetch_add(1, Ordering::Relaxed);
        let frame = SocketPacket::event(event, payload, Some(ack_id)).into_frame();
        let (ack_tx, ack_rx) = oneshot::channel();

        self.command_tx
            .send(LoopCommand::Emit {
                ack_id,
                frame,
                ack_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(self.config.ack_timeout, ack_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self.command_tx.send(LoopCommand::RemoveAck(ack_id));
                Err(Error::ack_timeout(ack_id, millis(self.config.ack_timeout)))
            }
        }
    }

    /// Asks the event loop to close without waiting for it.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(LoopCommand::Shutdown);
    }

    /// Closes the channel and waits for the event loop to finish.
    ///
    /// Safe to call more than once.
    pub async fn close(&self) {
        self.shutdown();

        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "Event loop task failed");
        }
    }
}

// ============================================================================
// Handshake
// ============================================================================

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Dials and runs the handshake under the handshake timeout.
async fn dial_and_handshake(
    dialer: &dyn Dialer,
    token: &GuestToken,
    config: &ConnectionConfig,
) -> Result<(Socket, OpenHandshake)> {
    let attempt = async {
        let mut socket = dialer.dial().await?;
        match handshake(&mut socket, token).await {
            Ok(open) => Ok((socket, open)),
            Err(e) => {
                socket.close().await;
                Err(e)
            }
        }
    };

    timeout(config.handshake_timeout, attempt)
        .await
        .map_err(|_| Error::connection_timeout(millis(config.handshake_timeout)))?
}

/// Waits for Engine.IO open, then connects the default namespace.
async fn handshake(socket: &mut Socket, token: &GuestToken) -> Result<OpenHandshake> {
    let open = loop {
        match EnginePacket::decode(&socket.next_text().await?)? {
            EnginePacket::Open(open) => break open,
            other => trace!(?other, "Ignoring packet before open"),
        }
    };
    debug!(sid = %open.sid, ping_interval = open.ping_interval, "Engine.IO open");

    let auth = serde_json::to_value(AuthPayload {
        token: token.as_str(),
    })?;
    socket
        .send_text(SocketPacket::connect(Some(auth)).into_frame())
        .await?;

    loop {
        match EnginePacket::decode(&socket.next_text().await?)? {
            EnginePacket::Ping(payload) => {
                socket.send_text(EnginePacket::Pong(payload).encode()).await?;
            }
            EnginePacket::Message(inner) => match SocketPacket::decode(&inner)? {
                SocketPacket::Connect { namespace, .. } if namespace == DEFAULT_NAMESPACE => {
                    return Ok(open);
                }
                SocketPacket::ConnectError { data, .. } => {
                    let message = data
                        .get("message")
                        .and_then(Value::as_str)
                        .map_or_else(|| data.to_string(), str::to_string);
                    warn!(%message, "Backend rejected connection");
                    return Err(Error::connect_rejected(message));
                }
                other => trace!(?other, "Ignoring packet before connect"),
            },
            EnginePacket::Close => return Err(Error::ConnectionClosed),
            _ => {}
        }
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// State owned by the spawned event loop task.
struct EventLoop {
    dialer: Arc<dyn Dialer>,
    token: GuestToken,
    config: ConnectionConfig,
    command_rx: mpsc::UnboundedReceiver<LoopCommand>,
    pending: Arc<Mutex<AckMap>>,
    handler: EventHandler,
    state: StateSender,
}

impl EventLoop {
    /// Runs until shutdown, server disconnect, or reconnection gives up.
    async fn run(mut self, mut socket: Socket, mut open: OpenHandshake) {
        loop {
            let end = self.run_link(&mut socket, &open).await;

            // Acks never survive a link
            self.fail_pending_acks();

            match end {
                LinkEnd::Shutdown => {
                    info!("Connection closed");
                    self.state.send_replace(ConnectionState::Disconnected);
                    break;
                }
                LinkEnd::ServerDisconnect => {
                    info!("Server closed the connection");
                    socket.close().await;
                    self.state.send_replace(ConnectionState::Disconnected);
                    break;
                }
                LinkEnd::Lost(reason) => {
                    warn!(%reason, "Connection lost");
                    socket.close().await;

                    match self.reconnect().await {
                        Some((new_socket, new_open)) => {
                            socket = new_socket;
                            open = new_open;
                        }
                        None => break,
                    }
                }
            }
        }

        debug!("Event loop terminated");
    }

    /// Pumps one live link until it ends.
    async fn run_link(&mut self, socket: &mut Socket, open: &OpenHandshake) -> LinkEnd {
        let window = Duration::from_millis(open.heartbeat_window_ms());
        let mut deadline = Instant::now() + window;

        loop {
            tokio::select! {
                frame = socket.next_frame() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            match self.handle_incoming_frame(&text, socket).await {
                                Ok(Some(end)) => return end,
                                Ok(None) => {}
                                Err(e) if e.is_connection_error() => {
                                    return LinkEnd::Lost(e.to_string());
                                }
                                Err(e) => warn!(error = %e, "Dropping malformed packet"),
                            }

                            if text.starts_with('2') {
                                deadline = Instant::now() + window;
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            return LinkEnd::Lost("closed by remote".into());
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            return LinkEnd::Lost(e.to_string());
                        }

                        None => {
                            return LinkEnd::Lost("stream ended".into());
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = self.command_rx.recv() => {
                    match command {
                        Some(LoopCommand::Emit { ack_id, frame, ack_tx }) => {
                            self.handle_emit(ack_id, frame, ack_tx, socket).await;
                        }

                        Some(LoopCommand::RemoveAck(ack_id)) => {
                            self.pending.lock().remove(&ack_id);
                            debug!(ack_id, "Removed timed-out acknowledgement");
                        }

                        Some(LoopCommand::Shutdown) | None => {
                            debug!("Shutdown requested");
                            let _ = socket.send_text(SocketPacket::disconnect().into_frame()).await;
                            socket.close().await;
                            return LinkEnd::Shutdown;
                        }
                    }
                }

                () = sleep_until(deadline) => {
                    return LinkEnd::Lost("ping timeout".into());
                }
            }
        }
    }

    /// Handles one inbound text frame.
    ///
    /// Returns `Some` if the link must end.
    async fn handle_incoming_frame(
        &self,
        text: &str,
        socket: &mut Socket,
    ) -> Result<Option<LinkEnd>> {
        match EnginePacket::decode(text)? {
            EnginePacket::Ping(payload) => {
                trace!("Ping");
                socket.send_text(EnginePacket::Pong(payload).encode()).await?;
            }
            EnginePacket::Close => return Ok(Some(LinkEnd::ServerDisconnect)),
            EnginePacket::Message(inner) => {
                return Ok(self.handle_socket_packet(SocketPacket::decode(&inner)?));
            }
            other => trace!(?other, "Ignoring Engine.IO packet"),
        }
        Ok(None)
    }

    /// Routes a Socket.IO packet.
    fn handle_socket_packet(&self, packet: SocketPacket) -> Option<LinkEnd> {
        if packet.namespace() != DEFAULT_NAMESPACE {
            warn!(namespace = packet.namespace(), "Packet for foreign namespace");
            return None;
        }

        match packet {
            SocketPacket::Event { mut data, id, .. } => {
                if id.is_some() {
                    debug!(?id, "Server requested an ack; not supported");
                }
                if data.is_empty() {
                    return None;
                }
                let Value::String(name) = data.remove(0) else {
                    return None;
                };
                trace!(event = %name, "Inbound event");
                (self.handler)(InboundEvent { name, args: data });
                None
            }

            SocketPacket::Ack { id, data, .. } => {
                let tx = self.pending.lock().remove(&id);
                if let Some(tx) = tx {
                    let _ = tx.send(Ok(data));
                } else {
                    warn!(ack_id = id, "Ack for unknown event");
                }
                None
            }

            SocketPacket::Disconnect { .. } => Some(LinkEnd::ServerDisconnect),

            SocketPacket::Connect { .. } | SocketPacket::ConnectError { .. } => {
                debug!("Ignoring connect packet on live link");
                None
            }
        }
    }

    /// Sends an event frame after registering its ack.
    async fn handle_emit(
        &self,
        ack_id: u64,
        frame: String,
        ack_tx: oneshot::Sender<Result<Vec<Value>>>,
        socket: &mut Socket,
    ) {
        // Store correlation before sending
        self.pending.lock().insert(ack_id, ack_tx);

        if let Err(e) = socket.send_text(frame).await
            && let Some(tx) = self.pending.lock().remove(&ack_id)
        {
            let _ = tx.send(Err(Error::connection(e.to_string())));
        }

        trace!(ack_id, "Event sent");
    }

    /// Redials with the original credential.
    ///
    /// Returns `None` (with the final state published) when the owner shut
    /// down or every attempt failed.
    async fn reconnect(&mut self) -> Option<(Socket, OpenHandshake)> {
        let attempts = self.config.reconnection_attempts;
        let mut last_error = String::from("reconnection disabled");

        for attempt in 1..=attempts {
            self.state
                .send_replace(ConnectionState::Reconnecting { attempt });

            if !self.wait_reconnection_delay(attempt).await {
                info!("Connection closed while reconnecting");
                self.state.send_replace(ConnectionState::Disconnected);
                return None;
            }

            debug!(attempt, max = attempts, "Reconnecting");
            match dial_and_handshake(self.dialer.as_ref(), &self.token, &self.config).await {
                Ok((socket, open)) => {
                    info!(attempt, sid = %open.sid, "Reconnected");
                    self.state.send_replace(ConnectionState::Connected);
                    return Some((socket, open));
                }
                Err(e @ Error::ConnectRejected { .. }) => {
                    // Credential is never renewed, so further attempts are futile
                    error!(error = %e, "Reconnection rejected");
                    self.state.send_replace(ConnectionState::errored(e.to_string()));
                    return None;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Reconnection attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        error!(attempts, "Giving up on reconnection");
        self.state.send_replace(ConnectionState::errored(format!(
            "reconnection failed after {attempts} attempts: {last_error}"
        )));
        None
    }

    /// Sleeps the reconnection delay while rejecting sends.
    ///
    /// Commands queued before the link dropped are drained first, so none
    /// of them reach the next link. Returns `false` if the owner asked to
    /// shut down.
    async fn wait_reconnection_delay(&mut self, attempt: u32) -> bool {
        let delay = sleep(self.config.reconnection_delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                biased;

                command = self.command_rx.recv() => {
                    match command {
                        Some(LoopCommand::Emit { ack_tx, .. }) => {
                            let _ = ack_tx.send(Err(Error::not_connected(
                                ConnectionState::Reconnecting { attempt },
                            )));
                        }
                        Some(LoopCommand::RemoveAck(ack_id)) => {
                            self.pending.lock().remove(&ack_id);
                        }
                        Some(LoopCommand::Shutdown) | None => return false,
                    }
                }

                () = &mut delay => return true,
            }
        }
    }

    /// Fails all pending acks with [`Error::ConnectionClosed`].
    fn fail_pending_acks(&self) {
        let pending: Vec<_> = self.pending.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending acknowledgements");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
