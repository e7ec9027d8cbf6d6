//! Shared fixtures for integration tests.
//!
//! - In-process Socket.IO backend over `tokio::io::duplex`
//! - Canned token providers
//! - One-shot HTTP responder for the guest-token endpoint

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::Role;
use tracing_subscriber::EnvFilter;

use guest_chat::protocol::{EnginePacket, SocketPacket};
use guest_chat::{
    ChatClient, ClientOptions, ConnectionState, Dialer, Error, GuestToken, KeyValueStore,
    MemoryStore, Result, SessionId, Socket, TokenProvider,
};

// ============================================================================
// Constants
// ============================================================================

/// Token handed out by [`StaticTokens`].
pub const TOKEN: &str = "abc";

/// Default Engine.IO open packet.
pub const OPEN: &str =
    r#"0{"sid":"eio-test","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

/// Upper bound for any single wait in tests.
pub const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Backend
// ============================================================================

/// Server side of every socket the client dials.
pub struct Backend {
    servers: mpsc::UnboundedReceiver<Socket>,
    pub dials: Arc<AtomicUsize>,
    pub refuse: Arc<AtomicBool>,
}

impl Backend {
    /// Waits for the client to dial and returns the server peer.
    pub async fn accept(&mut self) -> Peer {
        let socket = timeout(WAIT, self.servers.recv())
            .await
            .expect("client did not dial in time")
            .expect("dialer dropped");
        Peer { socket }
    }
}

/// [`Dialer`] creating in-memory WebSockets.
pub struct PipeDialer {
    servers: mpsc::UnboundedSender<Socket>,
    dials: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
}

#[async_trait]
impl Dialer for PipeDialer {
    async fn dial(&self) -> Result<Socket> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(Error::connection("connection refused"));
        }

        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (client_ws, server_ws) = tokio::join!(
            WebSocketStream::from_raw_socket(client_io, Role::Client, None),
            WebSocketStream::from_raw_socket(server_io, Role::Server, None),
        );
        self.servers
            .send(Socket::new(server_ws))
            .map_err(|_| Error::connection("backend gone"))?;
        Ok(Socket::new(client_ws))
    }
}

/// Creates a dialer and the backend receiving its sockets.
pub fn backend() -> (Arc<PipeDialer>, Backend) {
    let (servers_tx, servers_rx) = mpsc::unbounded_channel();
    let dials = Arc::new(AtomicUsize::new(0));
    let refuse = Arc::new(AtomicBool::new(false));

    let dialer = Arc::new(PipeDialer {
        servers: servers_tx,
        dials: Arc::clone(&dials),
        refuse: Arc::clone(&refuse),
    });
    let backend = Backend {
        servers: servers_rx,
        dials,
        refuse,
    };
    (dialer, backend)
}

// ============================================================================
// Peer
// ============================================================================

/// One server-side socket.
pub struct Peer {
    pub socket: Socket,
}

impl Peer {
    /// Sends a raw frame.
    pub async fn send(&mut self, frame: &str) {
        self.socket.send_text(frame.to_string()).await.expect("send frame");
    }

    /// Receives a raw frame.
    pub async fn recv(&mut self) -> String {
        timeout(WAIT, self.socket.next_text())
            .await
            .expect("no frame in time")
            .expect("receive frame")
    }

    /// Runs the server side of the handshake with the given open packet.
    pub async fn handshake_with(&mut self, open: &str) {
        self.send(open).await;
        assert_eq!(self.recv().await, format!(r#"40{{"token":"{TOKEN}"}}"#));
        self.send(r#"40{"sid":"sio-test"}"#).await;
    }

    /// Runs the default server handshake.
    pub async fn handshake(&mut self) {
        self.handshake_with(OPEN).await;
    }

    /// Receives the next Socket.IO event, skipping pongs.
    pub async fn recv_event(&mut self) -> (Option<u64>, String, Value) {
        loop {
            let frame = self.recv().await;
            let EnginePacket::Message(inner) = EnginePacket::decode(&frame).expect("engine packet")
            else {
                continue;
            };
            if let SocketPacket::Event { id, mut data, .. } =
                SocketPacket::decode(&inner).expect("socket packet")
            {
                let payload = data.pop().unwrap_or(Value::Null);
                let name = data
                    .first()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                return (id, name, payload);
            }
        }
    }

    /// Acknowledges an event.
    pub async fn ack(&mut self, id: u64, payload: Value) {
        let frame = SocketPacket::ack(id, vec![payload]).into_frame();
        self.socket.send_text(frame).await.expect("send ack");
    }

    /// Pushes a `chat:response` event.
    pub async fn respond(&mut self, message: &str) {
        let frame = SocketPacket::event(
            "chat:response",
            serde_json::json!({ "message": message }),
            None,
        )
        .into_frame();
        self.socket.send_text(frame).await.expect("send response");
    }

    /// Drops the link without a close frame.
    pub fn kill(self) {
        drop(self);
    }
}

// ============================================================================
// Token Providers
// ============================================================================

/// Returns [`TOKEN`] and records requested session ids.
#[derive(Default)]
pub struct StaticTokens {
    pub sessions: Mutex<Vec<SessionId>>,
}

#[async_trait]
impl TokenProvider for StaticTokens {
    async fn guest_token(&self, session_id: &SessionId) -> Result<GuestToken> {
        self.sessions.lock().push(session_id.clone());
        Ok(GuestToken::new(TOKEN))
    }
}

// ============================================================================
// Client
// ============================================================================

/// Options with fast reconnection for tests.
pub fn fast_options() -> ClientOptions {
    ClientOptions::new()
        .with_reconnection_delay(Duration::from_millis(20))
        .with_handshake_timeout(Duration::from_secs(2))
        .with_ack_timeout(Duration::from_secs(2))
}

/// Builds a client over the given store and test doubles.
pub fn client_with(
    store: Arc<dyn KeyValueStore>,
    tokens: Arc<dyn TokenProvider>,
    dialer: Arc<dyn Dialer>,
    options: ClientOptions,
) -> ChatClient {
    ChatClient::builder()
        .store(store)
        .token_provider(tokens)
        .dialer(dialer)
        .options(options)
        .build()
        .expect("build client")
}

/// Builds a client with a memory store and [`StaticTokens`].
pub fn client(dialer: Arc<dyn Dialer>) -> (ChatClient, Arc<StaticTokens>) {
    let tokens = Arc::new(StaticTokens::default());
    let client = client_with(
        Arc::new(MemoryStore::new()),
        tokens.clone(),
        dialer,
        fast_options(),
    );
    (client, tokens)
}

/// Initializes `client` while the backend accepts and handshakes.
pub async fn connect(client: &ChatClient, backend: &mut Backend) -> Peer {
    let (result, peer) = tokio::join!(client.initialize(), async {
        let mut peer = backend.accept().await;
        peer.handshake().await;
        peer
    });
    result.expect("initialize");
    assert_eq!(client.state(), ConnectionState::Connected);
    peer
}

/// Waits until the state satisfies `predicate`.
pub async fn wait_for_state<F>(rx: &mut watch::Receiver<ConnectionState>, predicate: F) -> ConnectionState
where
    F: Fn(&ConnectionState) -> bool,
{
    let state = timeout(WAIT, rx.wait_for(|state| predicate(state)))
        .await
        .expect("state not reached in time")
        .expect("state channel closed");
    state.clone()
}

// ============================================================================
// HTTP
// ============================================================================

/// Serves one canned HTTP response on a loopback port.
///
/// Returns the base URL and a handle yielding the request head.
pub async fn serve_http_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let response = format!(
        "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        socket.write_all(response.as_bytes()).await.expect("write");
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&head).into_owned()
    });

    (format!("http://{addr}"), handle)
}
