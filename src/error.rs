//! Error types for the guest chat client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use guest_chat::{ChatClient, Result};
//!
//! async fn example(client: &ChatClient) -> Result<()> {
//!     client.initialize().await?;
//!     client.send_message("hello").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Storage`] |
//! | Credential | [`Error::Credential`], [`Error::Http`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::ConnectRejected`], [`Error::NotConnected`] |
//! | Protocol | [`Error::InvalidArgument`], [`Error::Protocol`], [`Error::Backend`] |
//! | Execution | [`Error::AckTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::transport::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Persisted state could not be read or written.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    // ========================================================================
    // Credential Errors
    // ========================================================================
    /// Guest-token endpoint answered with a non-success status.
    #[error("Guest token request failed with status {status}: {message}")]
    Credential {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// HTTP transport error while talking to the guest-token endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Real-time connection failed.
    ///
    /// Returned when the channel cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Channel closed while an operation was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Backend refused the Socket.IO CONNECT (bad or expired token).
    #[error("Connection rejected by server: {message}")]
    ConnectRejected {
        /// Reason reported by the server.
        message: String,
    },

    /// Operation requires a connected channel.
    ///
    /// Returned immediately, nothing is queued.
    #[error("Not connected (state: {state})")]
    NotConnected {
        /// State of the channel at the time of the call.
        state: ConnectionState,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Invalid argument supplied by the caller.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Protocol violation or malformed packet.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Backend acknowledged a message with an error.
    #[error("Backend error: {message}")]
    Backend {
        /// Error text carried by the acknowledgement.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Acknowledgement for an emitted event never arrived.
    #[error("Acknowledgement {ack_id} timed out after {timeout_ms}ms")]
    AckTimeout {
        /// The ack id that timed out.
        ack_id: u64,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a credential error from an HTTP status and body.
    #[inline]
    pub fn credential(status: u16, message: impl Into<String>) -> Self {
        Self::Credential {
            status,
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a connect rejected error.
    #[inline]
    pub fn connect_rejected(message: impl Into<String>) -> Self {
        Self::ConnectRejected {
            message: message.into(),
        }
    }

    /// Creates a not connected error.
    #[inline]
    pub fn not_connected(state: ConnectionState) -> Self {
        Self::NotConnected { state }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a backend error.
    #[inline]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates an ack timeout error.
    #[inline]
    pub fn ack_timeout(ack_id: u64, timeout_ms: u64) -> Self {
        Self::AckTimeout { ack_id, timeout_ms }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::AckTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::ConnectRejected { .. }
                | Self::NotConnected { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error came from obtaining the guest credential.
    #[inline]
    #[must_use]
    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::Credential { .. } | Self::Http(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "Connection failed: failed to connect");
    }

    #[test]
    fn test_credential_display() {
        let err = Error::credential(500, "Internal Server Error");
        assert_eq!(
            err.to_string(),
            "Guest token request failed with status 500: Internal Server Error"
        );
        assert!(err.is_credential_error());
    }

    #[test]
    fn test_not_connected_display() {
        let err = Error::not_connected(ConnectionState::Uninitialized);
        assert_eq!(err.to_string(), "Not connected (state: uninitialized)");
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::connection_timeout(5000);
        let ack_err = Error::ack_timeout(3, 1000);
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(ack_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::connect_rejected("bad token").is_connection_error());
        assert!(!Error::config("test").is_connection_error());
        assert!(!Error::backend("nope").is_connection_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
