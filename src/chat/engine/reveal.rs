//! Time-sliced answer reveal.
//!
//! The gateway returns complete answers; this module splits them into
//! whitespace-aligned chunks with a delay schedule so the transcript fills
//! in progressively. Concatenating the chunks reproduces the answer
//! byte-for-byte.

use std::time::Duration;

use crate::chat::core::config::RevealConfig;

/// Split text into reveal chunks.
///
/// A chunk grows until it reaches the configured character budget and the
/// next break lands on whitespace, so words are never split.
#[must_use]
pub fn chunk_text(text: &str, config: &RevealConfig) -> Vec<String> {
    let max_chars = config.max_chunk_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for ch in text.chars() {
        if current_chars >= max_chars && ch.is_whitespace() {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push(ch);
        current_chars += 1;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Delay before revealing the next chunk, proportional to its length and
/// clamped to the configured bounds.
#[must_use]
pub fn chunk_delay(chunk: &str, config: &RevealConfig) -> Duration {
    let chars = chunk.chars().count() as u64;
    let millis = (chars * config.millis_per_char).clamp(config.min_delay_ms, config.max_delay_ms);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_chunk_chars: usize) -> RevealConfig {
        RevealConfig {
            max_chunk_chars,
            millis_per_char: 10,
            min_delay_ms: 20,
            max_delay_ms: 200,
        }
    }

    #[test]
    fn chunks_concatenate_back_to_the_answer() {
        let text = "El jazz fusion mezcla la improvisación del jazz\ncon texturas de rock,  funk y música latina.";
        let chunks = chunk_text(text, &config(12));
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn words_are_never_split() {
        let chunks = chunk_text("una respuesta razonablemente larga del asistente", &config(8));
        for window in chunks.windows(2) {
            // Every break sits before whitespace carried into the next chunk.
            assert!(window[1].starts_with(char::is_whitespace));
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("hola", &config(24));
        assert_eq!(chunks, vec!["hola".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", &config(24)).is_empty());
    }

    #[test]
    fn delay_is_proportional_and_clamped() {
        let cfg = config(24);
        assert_eq!(chunk_delay("abc", &cfg), Duration::from_millis(30));
        assert_eq!(chunk_delay("a", &cfg), Duration::from_millis(20));
        assert_eq!(
            chunk_delay(&"x".repeat(100), &cfg),
            Duration::from_millis(200)
        );
    }
}
