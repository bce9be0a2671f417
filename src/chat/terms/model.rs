//! Excluded term model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::ids::{TermId, UserId};

/// Semantic category of an excluded term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    /// An artist or band name.
    Artist,
    /// A musical genre.
    Genre,
    /// A song title.
    Song,
    /// An album title.
    Album,
    /// A free-form keyword.
    Keyword,
    /// Anything the user wants redacted.
    Custom,
}

impl TermCategory {
    /// Stable storage name for the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Genre => "genre",
            Self::Song => "song",
            Self::Album => "album",
            Self::Keyword => "keyword",
            Self::Custom => "custom",
        }
    }

    /// Parse a stored category name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "artist" => Some(Self::Artist),
            "genre" => Some(Self::Genre),
            "song" => Some(Self::Song),
            "album" => Some(Self::Album),
            "keyword" => Some(Self::Keyword),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// A user-configured string redacted from AI input and output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedTerm {
    /// Unique term identifier.
    pub id: TermId,
    /// Owning user.
    pub user_id: UserId,
    /// The redacted text.
    pub term: String,
    /// Semantic category.
    pub category: TermCategory,
    /// Optional user-provided reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Whether the term currently participates in filtering.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl ExcludedTerm {
    /// Create a new active term. The caller validates the text first.
    #[must_use]
    pub fn new(
        user_id: UserId,
        term: impl Into<String>,
        category: TermCategory,
        reason: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TermId::new(),
            user_id,
            term: term.into(),
            category,
            reason,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
