//! Connection lifecycle states.

use std::fmt;

/// Lifecycle of the single real-time channel owned by a client.
///
/// ```text
/// Uninitialized -> Initializing -> Connected <-> Reconnecting
///                       |              |              |
///                       v              v              v
///                    Errored      Disconnected     Errored
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Nothing attempted yet.
    #[default]
    Uninitialized,
    /// Fetching the credential or completing the handshake.
    Initializing,
    /// Handshake complete; sends are accepted.
    Connected,
    /// Link dropped; the transport is redialing.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// Closed on request, or by the server.
    Disconnected,
    /// Initialization or reconnection failed.
    Errored {
        /// Last failure.
        reason: String,
    },
}

impl ConnectionState {
    /// Returns `true` if sends are accepted.
    #[inline]
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` while a connection is, or is becoming, usable again.
    #[inline]
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Connected | Self::Reconnecting { .. })
    }

    /// Creates an errored state.
    #[inline]
    pub fn errored(reason: impl Into<String>) -> Self {
        Self::Errored {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Initializing => f.write_str("initializing"),
            Self::Connected => f.write_str("connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Disconnected => f.write_str("disconnected"),
            Self::Errored { reason } => write!(f, "errored: {reason}"),
        }
    }
}
