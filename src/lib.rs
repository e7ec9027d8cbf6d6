//! Guest Chat - session & messaging client for a hosted assistant.
//!
//! This library connects a visitor to a remote chat bot over Socket.IO,
//! authenticated with a short-lived guest credential.
//!
//! # Architecture
//!
//! The client follows a credential-then-channel model:
//!
//! - **Session**: a random identifier, created once and kept in durable storage
//! - **Credential**: the session id is exchanged for a guest token over HTTP
//! - **Channel**: a WebSocket speaking Socket.IO, authenticated with the token
//!
//! Key design principles:
//!
//! - Each [`ChatClient`] owns at most one channel and its lifecycle
//! - Storage, ids, credentials and sockets sit behind traits
//! - Sends fail immediately unless connected (no queueing)
//! - Only the transport redials, a fixed number of times
//!
//! # Quick Start
//!
//! ```no_run
//! use guest_chat::{ChatClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ChatClient::builder()
//!         .api_url("https://api.example.com")
//!         .ws_url("wss://chat.example.com")
//!         .build()?;
//!
//!     client.on_message(|reply| println!("bot: {}", reply.text));
//!     client.initialize().await?;
//!     client.send_message("hello").await?;
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`auth`] | Guest credential exchange |
//! | [`client`] | [`ChatClient`], builder, options, messages |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers and generators |
//! | [`protocol`] | Engine.IO / Socket.IO packets and chat payloads |
//! | [`storage`] | Durable key-value state |
//! | [`transport`] | WebSocket channel, event loop, reconnection |

// ============================================================================
// Modules
// ============================================================================

/// Guest credential exchange.
pub mod auth;

/// Chat client, builder, options, and messages.
///
/// - [`ChatClient`] - owns the channel
/// - [`ChatClientBuilder`] - fluent configuration
/// - [`ChatMessage`] - one message
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Wire protocol packets and chat payloads.
pub mod protocol;

/// Durable client-side state.
pub mod storage;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    ChatClient, ChatClientBuilder, ChatMessage, ClientOptions, ListenerId, Sender, Transcript,
};

// Credential types
pub use auth::{GuestToken, HttpTokenProvider, TokenProvider};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{IdGenerator, MessageId, SessionId, UuidGenerator};

// Storage types
pub use storage::{ConsentChoice, FileStore, KeyValueStore, MemoryStore, SessionStore};

// Transport types
pub use transport::{ConnectionState, Dialer, Socket, WebSocketDialer};
