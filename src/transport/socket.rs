//! WebSocket framing and dialing.
//!
//! A [`Socket`] is a type-erased WebSocket split into its frame sink and
//! frame stream, so the event loop runs the same over TLS, plain TCP, or an
//! in-memory pipe.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Engine.IO protocol revision requested in the URL.
const ENGINE_IO_VERSION: &str = "4";

/// Default Socket.IO endpoint path.
pub const DEFAULT_SOCKET_PATH: &str = "/socket.io/";

// ============================================================================
// Types
// ============================================================================

/// Outbound half of a WebSocket.
type FrameSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;

/// Inbound half of a WebSocket.
type FrameStream = Pin<Box<dyn Stream<Item = std::result::Result<Message, WsError>> + Send>>;

// ============================================================================
// Socket
// ============================================================================

/// An open WebSocket carrying text frames.
pub struct Socket {
    sink: FrameSink,
    stream: FrameStream,
}

impl Socket {
    /// Wraps an established WebSocket over any byte stream.
    pub fn new<S>(ws: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = ws.split();
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }

    /// Sends one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] if the write fails.
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Receives the next text frame, skipping control and binary frames.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] on a close frame or end of stream
    /// - [`Error::WebSocket`] on a transport error
    pub async fn next_text(&mut self) -> Result<String> {
        loop {
            match self.next_frame().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Close(_))) | None => return Err(Error::ConnectionClosed),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(_)) => {}
            }
        }
    }

    /// Receives the next raw frame.
    pub(crate) async fn next_frame(&mut self) -> Option<std::result::Result<Message, WsError>> {
        self.stream.next().await
    }

    /// Closes the WebSocket, ignoring errors.
    pub async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket").finish_non_exhaustive()
    }
}

// ============================================================================
// Dialer
// ============================================================================

/// Opens WebSocket connections to the chat backend.
///
/// Called once by [`initialize`](crate::ChatClient::initialize) and again
/// for every reconnection attempt.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Opens a new socket.
    async fn dial(&self) -> Result<Socket>;
}

// ============================================================================
// WebSocketDialer
// ============================================================================

/// [`Dialer`] connecting over TCP (and TLS for `wss`).
#[derive(Debug, Clone)]
pub struct WebSocketDialer {
    url: Url,
}

impl WebSocketDialer {
    /// Creates a dialer for the backend at `ws_url`.
    ///
    /// `http`/`https` schemes are mapped to `ws`/`wss`. The path is
    /// replaced with `socket_path` and the Engine.IO query is appended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unparsable URL or unsupported scheme.
    pub fn new(ws_url: &str, socket_path: &str) -> Result<Self> {
        let url = socket_url(ws_url, socket_path)?;
        Ok(Self { url })
    }

    /// Returns the full WebSocket URL dialed.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Dialer for WebSocketDialer {
    async fn dial(&self) -> Result<Socket> {
        debug!(url = %self.url, "Dialing WebSocket");

        let (ws, response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| Error::connection(format!("{}: {e}", self.url)))?;

        debug!(status = %response.status(), "WebSocket upgraded");
        Ok(Socket::new(ws))
    }
}

/// Builds `{scheme}://{host}{socket_path}?EIO=4&transport=websocket`.
fn socket_url(ws_url: &str, socket_path: &str) -> Result<Url> {
    let mut url =
        Url::parse(ws_url).map_err(|e| Error::config(format!("invalid WS URL {ws_url}: {e}")))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(Error::config(format!(
                "unsupported WS URL scheme: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::config(format!("cannot use scheme {scheme} for {ws_url}")))?;

    let path = if socket_path.ends_with('/') {
        socket_path.to_string()
    } else {
        format!("{socket_path}/")
    };
    url.set_path(&path);
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", ENGINE_IO_VERSION)
        .append_pair("transport", "websocket");

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_tungstenite::tungstenite::protocol::Role;

    #[test]
    fn test_socket_url_https() {
        let url = socket_url("https://chat.example.com", DEFAULT_SOCKET_PATH).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://chat.example.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_ws_with_port_and_custom_path() {
        let url = socket_url("ws://localhost:3001/ignored?x=1", "/rt").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:3001/rt/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_rejects_other_schemes() {
        assert!(matches!(
            socket_url("ftp://example.com", DEFAULT_SOCKET_PATH),
            Err(Error::Config { .. })
        ));
        assert!(socket_url("not a url", DEFAULT_SOCKET_PATH).is_err());
    }

    #[tokio::test]
    async fn test_socket_text_over_duplex() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let (client_ws, server_ws) = tokio::join!(
            WebSocketStream::from_raw_socket(client_io, Role::Client, None),
            WebSocketStream::from_raw_socket(server_io, Role::Server, None),
        );
        let mut client = Socket::new(client_ws);
        let mut server = Socket::new(server_ws);

        client.send_text("40".into()).await.unwrap();
        assert_eq!(server.next_text().await.unwrap(), "40");

        server.close().await;
        assert!(matches!(
            client.next_text().await,
            Err(Error::ConnectionClosed)
        ));
    }
}
