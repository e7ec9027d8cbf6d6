//! Chat client module.
//!
//! This module provides the main entry point: a session & messaging client
//! for a remote assistant backend.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ChatClient`] | Owns the channel; initialize, send, listen, disconnect |
//! | [`ChatClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Timeouts, reconnection, endpoint path |
//! | [`ChatMessage`] | One user or bot message |
//! | [`Transcript`] | Ordered in-memory message list |
//!
//! # Example
//!
//! ```no_run
//! use guest_chat::{ChatClient, Result, Transcript};
//!
//! # async fn example() -> Result<()> {
//! let client = ChatClient::builder()
//!     .api_url("https://api.example.com")
//!     .ws_url("wss://chat.example.com")
//!     .build()?;
//!
//! client.on_message(|reply| println!("bot: {}", reply.text));
//! client.initialize().await?;
//!
//! let mut transcript = Transcript::new();
//! transcript.push(client.send_message("Do you finance implants?").await?);
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Chat messages and transcript.
pub mod message;

/// Client options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ChatClientBuilder;
pub use self::core::{ChatClient, ListenerId, MessageListener};
pub use message::{ChatMessage, Sender, Transcript};
pub use options::ClientOptions;
