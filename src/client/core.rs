//! Session & messaging client.
//!
//! [`ChatClient`] owns one real-time channel and its lifecycle:
//!
//! 1. `initialize` - session id, guest token, connect
//! 2. `send_message` / `on_message` - relay text both ways
//! 3. `disconnect` - tear the channel down

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, error, info, warn};

use crate::auth::TokenProvider;
use crate::error::{Error, Result};
use crate::identifiers::{IdGenerator, SessionId};
use crate::protocol::{CHAT_MESSAGE_EVENT, CHAT_RESPONSE_EVENT, ChatRequest, ChatResponse, check_ack};
use crate::storage::SessionStore;
use crate::transport::{Connection, ConnectionState, Dialer, EventHandler, InboundEvent};

use super::builder::ChatClientBuilder;
use super::message::ChatMessage;
use super::options::ClientOptions;

// ============================================================================
// Types
// ============================================================================

/// Callback for inbound bot messages.
pub type MessageListener = Arc<dyn Fn(&ChatMessage) + Send + Sync>;

/// Registered listeners in registration order.
type ListenerList = Vec<(ListenerId, MessageListener)>;

/// Handle returned by [`ChatClient::on_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// ============================================================================
// ChatClient
// ============================================================================

/// Client for a remote assistant reachable over Socket.IO.
///
/// Owns at most one channel. Construct with [`ChatClient::builder`].
///
/// # Example
///
/// ```no_run
/// use guest_chat::{ChatClient, Result};
///
/// # async fn example() -> Result<()> {
/// let client = ChatClient::builder()
///     .api_url("https://api.example.com")
///     .ws_url("https://chat.example.com")
///     .build()?;
///
/// client.on_message(|message| println!("bot: {}", message.text));
/// client.initialize().await?;
/// client.send_message("What plans do you offer?").await?;
/// client.disconnect().await;
/// # Ok(())
/// # }
/// ```
pub struct ChatClient {
    /// Timing and endpoint settings.
    options: ClientOptions,
    /// Durable session id access.
    sessions: SessionStore,
    /// Message id source.
    ids: Arc<dyn IdGenerator>,
    /// Guest credential source.
    tokens: Arc<dyn TokenProvider>,
    /// Socket factory.
    dialer: Arc<dyn Dialer>,
    /// Inbound message listeners (shared with the event handler).
    listeners: Arc<RwLock<ListenerList>>,
    /// Next listener id.
    next_listener: AtomicU64,
    /// Bumped by every `disconnect`, under the `connection` lock.
    disconnects: AtomicU64,
    /// The single live channel, if any.
    connection: Mutex<Option<Connection>>,
    /// Serializes `initialize` calls.
    init_lock: AsyncMutex<()>,
    /// State publisher (shared with the connection).
    state: Arc<watch::Sender<ConnectionState>>,
}

impl ChatClient {
    /// Returns a builder for a new client.
    #[inline]
    #[must_use]
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::new()
    }

    /// Creates a client from its collaborators.
    pub(crate) fn from_parts(
        options: ClientOptions,
        sessions: SessionStore,
        ids: Arc<dyn IdGenerator>,
        tokens: Arc<dyn TokenProvider>,
        dialer: Arc<dyn Dialer>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Uninitialized);

        Self {
            options,
            sessions,
            ids,
            tokens,
            dialer,
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_listener: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            connection: Mutex::new(None),
            init_lock: AsyncMutex::new(()),
            state: Arc::new(state),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connects to the chat backend.
    ///
    /// Ensures a session identifier exists (creating and persisting one if
    /// absent), exchanges it for a guest token, then opens the channel
    /// authenticated with that token. A client that already holds a live
    /// channel returns immediately.
    ///
    /// Failures are not retried.
    ///
    /// # Errors
    ///
    /// - [`Error::Storage`] / [`Error::Io`] if the session id cannot be persisted
    /// - [`Error::Credential`] if the token endpoint answers non-2xx
    /// - [`Error::Http`] if the token endpoint is unreachable
    /// - [`Error::Connection`], [`Error::ConnectionTimeout`],
    ///   [`Error::ConnectRejected`] if the channel cannot be established
    /// - [`Error::ConnectionClosed`] if [`disconnect`](Self::disconnect) is
    ///   called before initialization finishes
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;

        if let Some(existing) = self.current_connection() {
            if existing.state().is_live() {
                debug!("Already initialized");
                return Ok(());
            }
            existing.close().await;
            self.connection.lock().take();
        }

        let epoch = self.disconnects.load(Ordering::SeqCst);
        self.state.send_replace(ConnectionState::Initializing);

        match self.establish().await {
            Ok(connection) => {
                {
                    let mut slot = self.connection.lock();
                    if self.disconnects.load(Ordering::SeqCst) == epoch {
                        *slot = Some(connection);
                        return Ok(());
                    }
                }

                info!("Disconnected during initialization");
                connection.close().await;
                self.state.send_replace(ConnectionState::Disconnected);
                Err(Error::ConnectionClosed)
            }
            Err(_) if self.disconnects.load(Ordering::SeqCst) != epoch => {
                debug!("Initialization abandoned after disconnect");
                self.state.send_replace(ConnectionState::Disconnected);
                Err(Error::ConnectionClosed)
            }
            Err(e) => {
                error!(error = %e, "Chat initialization failed");
                self.state
                    .send_replace(ConnectionState::errored(e.to_string()));
                Err(e)
            }
        }
    }

    /// Runs session, credential, and connect steps.
    async fn establish(&self) -> Result<Connection> {
        let session_id = self.sessions.session_id()?;
        let token = self.tokens.guest_token(&session_id).await?;
        info!(%session_id, "Guest token obtained, connecting");

        Connection::open(
            Arc::clone(&self.dialer),
            token,
            self.options.connection_config(),
            self.event_handler(),
            Arc::clone(&self.state),
        )
        .await
    }

    /// Builds the inbound event handler fanning replies out to listeners.
    fn event_handler(&self) -> EventHandler {
        let listeners = Arc::clone(&self.listeners);
        let ids = Arc::clone(&self.ids);

        Box::new(move |event: InboundEvent| {
            if event.name != CHAT_RESPONSE_EVENT {
                debug!(event = %event.name, "Ignoring event");
                return;
            }

            let response = match ChatResponse::from_args(&event.args) {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "Dropping chat response");
                    return;
                }
            };

            let message = ChatMessage::bot(ids.message_id(), response.message);

            // Listeners may register more listeners
            let snapshot: Vec<MessageListener> = listeners
                .read()
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();

            for listener in snapshot {
                listener(&message);
            }
        })
    }

    /// Closes the channel if open.
    ///
    /// Idempotent; safe to call when never initialized or already closed.
    /// An `initialize` still in flight is abandoned: it closes whatever it
    /// opened and fails with [`Error::ConnectionClosed`].
    pub async fn disconnect(&self) {
        let connection = {
            let mut slot = self.connection.lock();
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            slot.take()
        };

        let initializing = *self.state.borrow() == ConnectionState::Initializing;

        match connection {
            Some(connection) => {
                connection.close().await;
                self.state.send_replace(ConnectionState::Disconnected);
                info!("Chat disconnected");
            }
            None if initializing => {
                self.state.send_replace(ConnectionState::Disconnected);
                info!("Chat disconnected while initializing");
            }
            None => debug!("Disconnect without connection"),
        }
    }

    // ========================================================================
    // Messaging
    // ========================================================================

    /// Sends a user message and waits for the backend's acknowledgement.
    ///
    /// Requires a connected channel; otherwise fails immediately without
    /// touching the network. Returns the user-side message for display.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `text` is empty or whitespace
    /// - [`Error::NotConnected`] if there is no connected channel
    /// - [`Error::Backend`] if the acknowledgement carries an error
    /// - [`Error::ConnectionClosed`] / [`Error::AckTimeout`] if no
    ///   acknowledgement arrives
    pub async fn send_message(&self, text: impl Into<String>) -> Result<ChatMessage> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::invalid_argument("message text is empty"));
        }

        let Some(connection) = self.current_connection() else {
            let state = self.state();
            warn!(%state, "Send without connection");
            return Err(Error::not_connected(state));
        };

        let payload = serde_json::to_value(ChatRequest {
            message: text.clone(),
        })?;

        let ack = connection
            .emit_with_ack(CHAT_MESSAGE_EVENT, payload)
            .await
            .inspect_err(|e| warn!(error = %e, "Message send failed"))?;

        check_ack(&ack).inspect_err(|e| warn!(error = %e, "Backend rejected message"))?;

        debug!("Message acknowledged");
        Ok(ChatMessage::user(self.ids.message_id(), text))
    }

    /// Registers a listener for inbound bot messages.
    ///
    /// Every listener receives every message, in registration order.
    pub fn on_message<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the current channel state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Returns `true` if messages can be sent.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    /// Subscribes to state changes.
    #[inline]
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Returns the persisted session identifier, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns any error from the backing store.
    pub fn session_id(&self) -> Result<SessionId> {
        self.sessions.session_id()
    }

    /// Returns the durable session and consent store.
    #[inline]
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Returns the client options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Clones the current connection handle.
    fn current_connection(&self) -> Option<Connection> {
        self.connection.lock().clone()
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("state", &*self.state.borrow())
            .field("listeners", &self.listeners.read().len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.shutdown();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    use crate::auth::GuestToken;
    use crate::identifiers::UuidGenerator;
    use crate::storage::MemoryStore;
    use crate::transport::Socket;

    /// Token provider that always fails with a status.
    struct FailingTokens(u16);

    #[async_trait]
    impl TokenProvider for FailingTokens {
        async fn guest_token(&self, _: &SessionId) -> Result<GuestToken> {
            Err(Error::credential(self.0, "Internal Server Error"))
        }
    }

    /// Dialer counting attempts; never succeeds.
    #[derive(Default)]
    struct CountingDialer {
        dials: AtomicUsize,
    }

    #[async_trait]
    impl Dialer for CountingDialer {
        async fn dial(&self) -> Result<Socket> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            Err(Error::connection("unreachable"))
        }
    }

    fn client(tokens: Arc<dyn TokenProvider>, dialer: Arc<dyn Dialer>) -> ChatClient {
        let ids: Arc<dyn IdGenerator> = Arc::new(UuidGenerator);
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()), Arc::clone(&ids));
        ChatClient::from_parts(ClientOptions::new(), sessions, ids, tokens, dialer)
    }

    #[tokio::test]
    async fn test_send_before_initialize_rejected() {
        let dialer = Arc::new(CountingDialer::default());
        let client = client(Arc::new(FailingTokens(500)), dialer.clone());

        let err = client.send_message("hello").await.unwrap_err();
        assert!(matches!(
            err,
            Error::NotConnected {
                state: ConnectionState::Uninitialized
            }
        ));
        assert_eq!(dialer.dials.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let client = client(
            Arc::new(FailingTokens(500)),
            Arc::new(CountingDialer::default()),
        );
        let err = client.send_message("   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_credential_failure_skips_dial() {
        let dialer = Arc::new(CountingDialer::default());
        let client = client(Arc::new(FailingTokens(500)), dialer.clone());

        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, Error::Credential { status: 500, .. }));
        assert_eq!(dialer.dials.load(Ordering::SeqCst), 0);
        assert!(matches!(client.state(), ConnectionState::Errored { .. }));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let client = client(
            Arc::new(FailingTokens(500)),
            Arc::new(CountingDialer::default()),
        );
        client.disconnect().await;
        client.disconnect().await;
        assert_eq!(client.state(), ConnectionState::Uninitialized);
    }

    #[test]
    fn test_listener_registration() {
        let client = client(
            Arc::new(FailingTokens(500)),
            Arc::new(CountingDialer::default()),
        );
        let first = client.on_message(|_| {});
        let second = client.on_message(|_| {});
        assert_ne!(first, second);

        assert!(client.remove_listener(first));
        assert!(!client.remove_listener(first));
        assert_eq!(client.listeners.read().len(), 1);
    }

    #[test]
    fn test_event_handler_fans_out_chat_responses() {
        let client = client(
            Arc::new(FailingTokens(500)),
            Arc::new(CountingDialer::default()),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            client.on_message(move |message| {
                seen.lock().push((tag, message.id, message.text.clone()));
            });
        }

        let handler = client.event_handler();
        handler(InboundEvent {
            name: "chat:response".into(),
            args: vec![serde_json::json!({ "message": "Hello!" })],
        });
        handler(InboundEvent {
            name: "other".into(),
            args: vec![],
        });

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "a");
        assert_eq!(seen[1].0, "b");
        assert_eq!(seen[0].1, seen[1].1);
        assert_eq!(seen[0].2, "Hello!");
    }
}
