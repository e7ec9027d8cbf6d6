//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing a session identifier with a message
//! identifier at compile time.
//!
//! | Type | Source | Lifetime |
//! |------|--------|----------|
//! | [`SessionId`] | [`IdGenerator`], persisted | Per browser profile / store |
//! | [`MessageId`] | [`IdGenerator`] | Per chat message, never persisted |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// SessionId
// ============================================================================

/// Durable identifier for one client profile.
///
/// Created once, stored, and exchanged for a guest credential on every
/// [`initialize`](crate::ChatClient::initialize).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an existing identifier string.
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// MessageId
// ============================================================================

/// Identifier of a single chat message in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generates a new random message ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// IdGenerator
// ============================================================================

/// Source of random unique identifiers.
///
/// Substitute a deterministic generator in tests.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh unique token.
    fn generate(&self) -> Uuid;

    /// Returns a fresh session identifier.
    fn session_id(&self) -> SessionId {
        SessionId(self.generate().to_string())
    }

    /// Returns a fresh message identifier.
    fn message_id(&self) -> MessageId {
        MessageId(self.generate())
    }
}

/// [`IdGenerator`] backed by random UUID v4 values.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    #[inline]
    fn generate(&self) -> Uuid {
        Uuid::new_v4()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_display() {
        let id = SessionId::new("abc-123");
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_session_id_serde_transparent() {
        let id = SessionId::new("s1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"s1\"");
    }

    #[test]
    fn test_uuid_generator_unique() {
        let generator = UuidGenerator;
        assert_ne!(generator.session_id(), generator.session_id());
        assert_ne!(generator.message_id(), generator.message_id());
    }

    #[test]
    fn test_session_id_is_uuid_text() {
        let id = UuidGenerator.session_id();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }
}
