//! Real-time wire protocol.
//!
//! The channel speaks Socket.IO (v5) framed in Engine.IO (v4) text
//! packets over a single WebSocket.
//!
//! # Packet Layers
//!
//! | Layer | Packet | Example |
//! |-------|--------|---------|
//! | Engine.IO | open | `0{"sid":"..","pingInterval":25000,..}` |
//! | Engine.IO | ping / pong | `2` / `3` |
//! | Socket.IO | connect (auth) | `40{"token":".."}` |
//! | Socket.IO | event with ack | `421["chat:message",{"message":"hi"}]` |
//! | Socket.IO | ack | `431[{"success":true}]` |
//! | Socket.IO | connect error | `44{"message":"invalid token"}` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Chat event names and payloads |
//! | `packet` | Engine.IO / Socket.IO packet codec |

// ============================================================================
// Submodules
// ============================================================================

/// Chat event names and payloads.
pub mod event;

/// Engine.IO / Socket.IO packet codec.
pub mod packet;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{
    AuthPayload, CHAT_MESSAGE_EVENT, CHAT_RESPONSE_EVENT, ChatRequest, ChatResponse, check_ack,
};
pub use packet::{DEFAULT_NAMESPACE, EnginePacket, OpenHandshake, SocketPacket};
