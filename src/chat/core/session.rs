//! Chat session model and derived metadata helpers.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chat::core::message::{ChatMessage, Sender};

/// Maximum title length in characters.
const TITLE_MAX_CHARS: usize = 50;

/// Characters kept before the ellipsis when no sentence boundary fits.
const TITLE_HEAD_CHARS: usize = 47;

/// Maximum preview length in characters.
const PREVIEW_MAX_CHARS: usize = 80;

/// Maximum number of auto-extracted topic tags.
const MAX_TOPICS: usize = 5;

/// Default title before the first user message arrives.
const UNTITLED: &str = "Nueva conversación";

/// Music topics recognized by the tag extractor.
const TOPIC_KEYWORDS: &[&str] = &[
    "jazz",
    "rock",
    "pop",
    "blues",
    "salsa",
    "reggaeton",
    "cumbia",
    "metal",
    "clásica",
    "classical",
    "hip hop",
    "rap",
    "electrónica",
    "electronic",
    "folk",
    "indie",
    "soul",
    "funk",
    "flamenco",
    "bachata",
    "merengue",
    "tango",
    "country",
    "r&b",
    "punk",
    "disco",
    "bolero",
    "ska",
    "house",
    "techno",
];

/// One continuous chat conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Session identifier. Client-generated, but the gateway may replace it
    /// with a server-assigned id.
    pub id: String,
    /// Title derived from the first user message.
    pub title: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time. Non-decreasing.
    pub updated_at: DateTime<Utc>,
    /// Ordered, append-only transcript.
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Create an empty session with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: UNTITLED.to_string(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        }
    }

    /// Append a message, deriving the title from the first user message.
    pub fn push_message(&mut self, message: ChatMessage) {
        if message.sender == Sender::User && !self.has_user_messages() {
            self.title = derive_title(&message.text);
        }
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// First user-authored message, if any.
    #[must_use]
    pub fn first_user_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.sender == Sender::User)
    }

    /// Whether the user has said anything yet.
    #[must_use]
    pub fn has_user_messages(&self) -> bool {
        self.first_user_message().is_some()
    }

    /// Short preview line for history lists.
    #[must_use]
    pub fn preview(&self) -> String {
        let source = self
            .first_user_message()
            .map_or_else(|| self.title.as_str(), |m| m.text.as_str());
        truncate_chars(source.trim(), PREVIEW_MAX_CHARS)
    }

    /// Auto-extract music-topic tags from the user's side of the transcript.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let mut haystack = String::new();
        for message in &self.messages {
            if message.sender == Sender::User {
                for lower in message.text.chars().flat_map(char::to_lowercase) {
                    haystack.push(lower);
                }
                haystack.push(' ');
            }
        }

        let mut topics = Vec::new();
        for keyword in TOPIC_KEYWORDS {
            if topics.len() == MAX_TOPICS {
                break;
            }
            if haystack.contains(keyword) {
                topics.push((*keyword).to_string());
            }
        }
        topics
    }
}

/// Generate a client-side session id: epoch millis plus a random suffix.
#[must_use]
pub fn new_session_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
    format!("{millis}-{suffix:06x}")
}

/// Derive a session title from the first user message.
///
/// A message of at most 50 characters becomes the title verbatim (trimmed).
/// Longer messages keep their leading sentence when a terminator occurs
/// within the first 50 characters; otherwise the first 47 characters plus
/// an ellipsis.
#[must_use]
pub fn derive_title(text: &str) -> String {
    let trimmed = text.trim();
    let chars: Vec<char> = trimmed.chars().collect();

    if chars.len() <= TITLE_MAX_CHARS {
        return trimmed.to_string();
    }

    if let Some(pos) = chars
        .iter()
        .take(TITLE_MAX_CHARS)
        .position(|c| matches!(c, '.' | '!' | '?'))
    {
        let sentence: String = chars[..=pos].iter().collect();
        return sentence.trim().to_string();
    }

    let head: String = chars[..TITLE_HEAD_CHARS].iter().collect();
    format!("{}...", head.trim_end())
}

/// Truncate to a character budget, appending an ellipsis when cut.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }
    let head: String = chars[..max_chars.saturating_sub(3)].iter().collect();
    format!("{}...", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_becomes_title_verbatim() {
        assert_eq!(derive_title("  Recomiéndame jazz  "), "Recomiéndame jazz");
    }

    #[test]
    fn long_message_keeps_leading_sentence() {
        let text = "Me gusta el jazz. Pero también quiero descubrir algo de blues clásico y soul de los setenta";
        assert_eq!(derive_title(text), "Me gusta el jazz.");
    }

    #[test]
    fn long_message_without_terminator_is_cut_with_ellipsis() {
        let text = "a".repeat(80);
        let title = derive_title(&text);
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with("..."));
        assert_eq!(&title[..47], "a".repeat(47).as_str());
    }

    #[test]
    fn boundary_length_message_is_untouched() {
        let text = "b".repeat(50);
        assert_eq!(derive_title(&text), text);
    }

    #[test]
    fn title_derived_on_first_user_message_only() {
        let mut session = ChatSession::new("s-1");
        session.push_message(ChatMessage::assistant("hola", None));
        assert_eq!(session.title, UNTITLED);

        session.push_message(ChatMessage::user("¿Qué es el jazz fusion?", None));
        assert_eq!(session.title, "¿Qué es el jazz fusion?");

        session.push_message(ChatMessage::user("otra pregunta distinta", None));
        assert_eq!(session.title, "¿Qué es el jazz fusion?");
    }

    #[test]
    fn session_id_has_millis_and_suffix() {
        let id = new_session_id();
        let (millis, suffix) = id.split_once('-').expect("dash separator");
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 6);
    }

    #[test]
    fn topics_are_deduplicated_and_capped() {
        let mut session = ChatSession::new("s-1");
        session.push_message(ChatMessage::user(
            "Quiero jazz, Jazz y más JAZZ, con algo de salsa, rock, blues, soul y funk",
            None,
        ));
        let topics = session.topics();
        assert_eq!(topics.iter().filter(|t| t.as_str() == "jazz").count(), 1);
        assert!(topics.len() <= 5);
    }

    #[test]
    fn updated_at_never_decreases() {
        let mut session = ChatSession::new("s-1");
        let before = session.updated_at;
        session.push_message(ChatMessage::user("hola", None));
        assert!(session.updated_at >= before);
    }
}
