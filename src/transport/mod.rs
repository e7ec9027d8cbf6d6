//! Real-time transport layer.
//!
//! This module handles the WebSocket channel between the client and the
//! chat backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  ChatClient     │                              │  Chat backend   │
//! │                 │   WebSocket (Socket.IO v5)   │                 │
//! │  Dialer         │◄────────────────────────────►│  /socket.io/    │
//! │  → Connection   │   auth: { token }            │                 │
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Dialer::dial` - Open the WebSocket
//! 2. Handshake - Engine.IO open, Socket.IO CONNECT with the guest token
//! 3. `Connection` - Emit events, receive events and acks
//! 4. Link lost - Redial a fixed number of times with a fixed delay
//! 5. `Connection::close` - Send DISCONNECT and close the socket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Handshake, event loop, ack correlation, reconnection |
//! | `socket` | WebSocket framing and dialing |
//! | `state` | Connection lifecycle states |

// ============================================================================
// Submodules
// ============================================================================

/// Handshake, event loop, ack correlation, reconnection.
pub mod connection;

/// WebSocket framing and dialing.
pub mod socket;

/// Connection lifecycle states.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ConnectionConfig, EventHandler, InboundEvent, StateSender};
pub use socket::{DEFAULT_SOCKET_PATH, Dialer, Socket, WebSocketDialer};
pub use state::ConnectionState;
