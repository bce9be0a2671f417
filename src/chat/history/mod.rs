//! Conversation persistence: the remote store seam and the local cache.

pub mod cache;
pub mod remote;

pub use cache::ConversationCache;
pub use remote::RemoteConversationStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::UserId;
use crate::chat::core::session::ChatSession;

/// Summary line for a stored conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Session identifier.
    pub id: String,
    /// Derived title.
    pub title: String,
    /// Number of messages in the transcript.
    pub message_count: usize,
    /// First-user-message preview. Cache-derived; remote lists may omit it.
    #[serde(default)]
    pub preview: String,
    /// Auto-extracted topic tags. Cache-derived.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Whether the user starred the conversation. Cache-only.
    #[serde(default)]
    pub starred: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Filters for listing cached conversations.
#[derive(Clone, Debug, Default)]
pub struct ListFilters {
    /// Keep conversations updated at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Keep conversations updated at or before this instant.
    pub to: Option<DateTime<Utc>>,
    /// Keep only starred conversations.
    pub starred_only: bool,
    /// Case-insensitive free-text search over title and message bodies.
    pub search: Option<String>,
}

/// Seam over conversation persistence so the engine can be tested with fakes.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// List a user's conversations, newest-updated first.
    ///
    /// # Errors
    /// Returns a transport or status error.
    async fn list(&self, user_id: &UserId) -> ChatResult<Vec<ConversationSummary>>;

    /// Fetch a conversation by session id.
    ///
    /// # Errors
    /// Returns a transport or status error.
    async fn get(&self, session_id: &str) -> ChatResult<Option<ChatSession>>;

    /// Save or append a conversation keyed by its session id.
    ///
    /// # Errors
    /// Returns a transport or status error.
    async fn save(&self, user_id: &UserId, session: &ChatSession) -> ChatResult<()>;

    /// Delete a conversation by session id.
    ///
    /// # Errors
    /// Returns `ChatError::NotFound` when the id is unknown, or a transport
    /// or status error.
    async fn delete(&self, session_id: &str) -> ChatResult<()>;
}
