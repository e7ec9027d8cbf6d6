//! Client timing, retry, and endpoint options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use guest_chat::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_reconnection_attempts(3)
//!     .with_reconnection_delay(Duration::from_millis(500))
//!     .with_ack_timeout(Duration::from_secs(15));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::ConnectionConfig;
use crate::transport::DEFAULT_SOCKET_PATH;
use crate::transport::connection::{
    DEFAULT_ACK_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_MAX_PENDING_ACKS,
    DEFAULT_RECONNECTION_ATTEMPTS, DEFAULT_RECONNECTION_DELAY,
};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the guest-token HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// ClientOptions
// ============================================================================

/// Tunables for a [`ChatClient`](crate::ChatClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Timeout for the guest-token request.
    pub request_timeout: Duration,

    /// Timeout for dial plus Socket.IO handshake.
    pub handshake_timeout: Duration,

    /// Timeout for each message acknowledgement.
    pub ack_timeout: Duration,

    /// Transport redial attempts after an unexpected drop.
    pub reconnection_attempts: u32,

    /// Fixed delay before each redial.
    pub reconnection_delay: Duration,

    /// Maximum in-flight messages awaiting acknowledgement.
    pub max_pending_acks: usize,

    /// Socket.IO endpoint path on the real-time host.
    pub socket_path: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            reconnection_attempts: DEFAULT_RECONNECTION_ATTEMPTS,
            reconnection_delay: DEFAULT_RECONNECTION_DELAY,
            max_pending_acks: DEFAULT_MAX_PENDING_ACKS,
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the guest-token request timeout.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the acknowledgement timeout.
    #[inline]
    #[must_use]
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Sets the number of redial attempts (0 disables reconnection).
    #[inline]
    #[must_use]
    pub fn with_reconnection_attempts(mut self, attempts: u32) -> Self {
        self.reconnection_attempts = attempts;
        self
    }

    /// Sets the fixed delay before each redial.
    #[inline]
    #[must_use]
    pub fn with_reconnection_delay(mut self, delay: Duration) -> Self {
        self.reconnection_delay = delay;
        self
    }

    /// Sets the in-flight acknowledgement limit.
    #[inline]
    #[must_use]
    pub fn with_max_pending_acks(mut self, max: usize) -> Self {
        self.max_pending_acks = max;
        self
    }

    /// Sets the Socket.IO endpoint path.
    #[inline]
    #[must_use]
    pub fn with_socket_path(mut self, path: impl Into<String>) -> Self {
        self.socket_path = path.into();
        self
    }
}

// ============================================================================
// Conversion & Validation
// ============================================================================

impl ClientOptions {
    /// Returns the transport settings.
    #[must_use]
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            handshake_timeout: self.handshake_timeout,
            ack_timeout: self.ack_timeout,
            reconnection_attempts: self.reconnection_attempts,
            reconnection_delay: self.reconnection_delay,
            max_pending_acks: self.max_pending_acks,
        }
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a timeout is zero, the ack limit is zero,
    /// or the socket path is not absolute.
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("request_timeout", self.request_timeout),
            ("handshake_timeout", self.handshake_timeout),
            ("ack_timeout", self.ack_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(Error::config(format!("{name} must be greater than zero")));
            }
        }

        if self.max_pending_acks == 0 {
            return Err(Error::config("max_pending_acks must be greater than zero"));
        }

        if !self.socket_path.starts_with('/') {
            return Err(Error::config(format!(
                "socket_path must start with '/': {}",
                self.socket_path
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::new();
        assert_eq!(options.reconnection_attempts, 5);
        assert_eq!(options.reconnection_delay, Duration::from_secs(1));
        assert_eq!(options.socket_path, "/socket.io/");
        assert_eq!(options, ClientOptions::default());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_connection_config_mirrors_options() {
        let options = ClientOptions::new()
            .with_reconnection_attempts(2)
            .with_reconnection_delay(Duration::from_millis(50))
            .with_ack_timeout(Duration::from_secs(3))
            .with_max_pending_acks(4);

        let config = options.connection_config();
        assert_eq!(config.reconnection_attempts, 2);
        assert_eq!(config.reconnection_delay, Duration::from_millis(50));
        assert_eq!(config.ack_timeout, Duration::from_secs(3));
        assert_eq!(config.max_pending_acks, 4);
    }

    #[test]
    fn test_validate_zero_timeout() {
        let options = ClientOptions::new().with_ack_timeout(Duration::ZERO);
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("ack_timeout"));
    }

    #[test]
    fn test_validate_zero_pending() {
        assert!(ClientOptions::new().with_max_pending_acks(0).validate().is_err());
    }

    #[test]
    fn test_validate_relative_socket_path() {
        assert!(ClientOptions::new().with_socket_path("socket.io").validate().is_err());
    }

    #[test]
    fn test_zero_reconnection_attempts_is_valid() {
        assert!(ClientOptions::new().with_reconnection_attempts(0).validate().is_ok());
    }
}
