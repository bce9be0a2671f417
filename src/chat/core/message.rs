//! Chat message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::ids::MessageId;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The human user.
    User,
    /// The AI assistant.
    Assistant,
}

/// A single message in a conversation transcript.
///
/// Assistant text is appended to in place while a reveal is running and is
/// immutable once the exchange completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: MessageId,
    /// Message author.
    pub sender: Sender,
    /// Message content.
    pub text: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Session the message belongs to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatMessage {
    /// Create a user message.
    #[must_use]
    pub fn user(text: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
            session_id,
        }
    }

    /// Create an assistant message with content.
    #[must_use]
    pub fn assistant(text: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            session_id,
        }
    }

    /// Create an empty assistant placeholder for a pending exchange.
    #[must_use]
    pub fn assistant_placeholder(session_id: Option<String>) -> Self {
        Self::assistant(String::new(), session_id)
    }

    /// Whether the message carries no visible text yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
