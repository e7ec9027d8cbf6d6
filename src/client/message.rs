//! Chat messages and the transient transcript.

use std::slice;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::MessageId;

// ============================================================================
// Sender
// ============================================================================

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The visitor.
    User,
    /// The assistant backend.
    Bot,
}

// ============================================================================
// ChatMessage
// ============================================================================

/// One message in a conversation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message id.
    pub id: MessageId,
    /// Message body.
    pub text: String,
    /// Author.
    pub sender: Sender,
    /// Creation (user) or arrival (bot) time.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a user-authored message stamped now.
    #[must_use]
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, text, Sender::User)
    }

    /// Creates a bot-authored message stamped now.
    #[must_use]
    pub fn bot(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, text, Sender::Bot)
    }

    fn new(id: MessageId, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    /// Returns `true` if the bot wrote this message.
    #[inline]
    #[must_use]
    pub fn is_from_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

// ============================================================================
// Transcript
// ============================================================================

/// Ordered in-memory list of messages, as shown in a chat window.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Returns the most recent message.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Iterates messages oldest first.
    pub fn iter(&self) -> slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }

    /// Returns the number of messages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a ChatMessage;
    type IntoIter = slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Sender::Bot).unwrap(), "\"bot\"");
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"user\"");
    }

    #[test]
    fn test_transcript_order() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());

        transcript.push(ChatMessage::user(MessageId::generate(), "hello"));
        transcript.push(ChatMessage::bot(MessageId::generate(), "Hi! How can I help?"));

        let texts: Vec<_> = transcript.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["hello", "Hi! How can I help?"]);
        assert!(transcript.last().unwrap().is_from_bot());

        transcript.clear();
        assert_eq!(transcript.len(), 0);
    }
}
