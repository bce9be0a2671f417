//! Term validation and case-insensitive redaction.

use std::sync::LazyLock;

use regex::Regex;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::terms::model::ExcludedTerm;

/// Minimum accepted term length in characters.
pub const TERM_MIN_CHARS: usize = 2;

/// Maximum accepted term length in characters.
pub const TERM_MAX_CHARS: usize = 100;

/// Letters (any script, so Spanish accents pass), digits, combining marks,
/// space, and basic punctuation.
static TERM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[\p{L}\p{N}\p{M} .,;:'"!?¡¿()&/-]+$"#).expect("term pattern is valid")
});

/// Result of redacting text against a set of terms.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilteredText {
    /// Text with matching occurrences removed and whitespace collapsed.
    pub text: String,
    /// Terms that matched at least once, in configuration order.
    pub removed: Vec<String>,
}

/// Report of a non-mutating match check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// Whether any active term matched.
    pub has_matches: bool,
    /// Terms that matched, in configuration order.
    pub matched: Vec<String>,
}

/// Validate a candidate excluded term, returning the trimmed text.
///
/// # Errors
/// Returns `ChatError::InvalidTerm` when the trimmed term is shorter than 2
/// or longer than 100 characters, or contains characters outside letters,
/// digits, space, and basic punctuation.
pub fn validate_term(raw: &str) -> ChatResult<String> {
    let trimmed = raw.trim();
    let chars = trimmed.chars().count();

    if chars < TERM_MIN_CHARS {
        return Err(ChatError::InvalidTerm(format!(
            "term must have at least {TERM_MIN_CHARS} characters"
        )));
    }
    if chars > TERM_MAX_CHARS {
        return Err(ChatError::InvalidTerm(format!(
            "term must have at most {TERM_MAX_CHARS} characters"
        )));
    }
    if !TERM_PATTERN.is_match(trimmed) {
        return Err(ChatError::InvalidTerm(
            "term contains unsupported characters".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

/// Remove every case-insensitive occurrence of each active term, then
/// collapse the resulting whitespace.
///
/// Text that matches no term is returned byte-for-byte unchanged.
#[must_use]
pub fn apply_terms(text: &str, terms: &[ExcludedTerm]) -> FilteredText {
    let mut current = text.to_string();
    let mut removed = Vec::new();

    for term in terms.iter().filter(|t| t.is_active) {
        let (next, hits) = remove_occurrences(&current, &term.term);
        if hits > 0 {
            removed.push(term.term.clone());
            current = next;
        }
    }

    if removed.is_empty() {
        return FilteredText {
            text: text.to_string(),
            removed,
        };
    }

    FilteredText {
        text: collapse_whitespace(&current),
        removed,
    }
}

/// Non-mutating check for active-term occurrences.
#[must_use]
pub fn find_matches(text: &str, terms: &[ExcludedTerm]) -> MatchReport {
    let matched: Vec<String> = terms
        .iter()
        .filter(|t| t.is_active)
        .filter(|t| match_at_any(text, &t.term))
        .map(|t| t.term.clone())
        .collect();

    MatchReport {
        has_matches: !matched.is_empty(),
        matched,
    }
}

/// Remove all case-insensitive occurrences of `needle`, returning the new
/// text and the number of occurrences removed.
fn remove_occurrences(haystack: &str, needle: &str) -> (String, usize) {
    if needle.is_empty() {
        return (haystack.to_string(), 0);
    }

    let mut out = String::with_capacity(haystack.len());
    let mut hits = 0usize;
    let mut idx = 0usize;

    while idx < haystack.len() {
        if let Some(len) = match_len_at(haystack, idx, needle) {
            hits += 1;
            idx += len;
        } else {
            // idx always sits on a char boundary
            let ch = haystack[idx..].chars().next().unwrap_or('\u{0}');
            out.push(ch);
            idx += ch.len_utf8();
        }
    }

    (out, hits)
}

/// Length in bytes of a case-insensitive match of `needle` at `start`, if any.
///
/// Comparison is per-character lowercase, which covers the simple
/// lower-casing the product requires (including Spanish accents).
fn match_len_at(haystack: &str, start: usize, needle: &str) -> Option<usize> {
    let mut hay = haystack[start..].chars();
    let mut len = 0usize;

    for n_ch in needle.chars() {
        let h_ch = hay.next()?;
        if !h_ch.to_lowercase().eq(n_ch.to_lowercase()) {
            return None;
        }
        len += h_ch.len_utf8();
    }

    Some(len)
}

fn match_at_any(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack
        .char_indices()
        .any(|(idx, _)| match_len_at(haystack, idx, needle).is_some())
}

/// Collapse runs of whitespace into single spaces and trim the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;

    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::core::ids::UserId;
    use crate::chat::terms::model::TermCategory;

    fn term(text: &str, active: bool) -> ExcludedTerm {
        let user = UserId::new("tester").expect("valid user id");
        let mut t = ExcludedTerm::new(user, text, TermCategory::Keyword, None);
        t.is_active = active;
        t
    }

    #[test]
    fn one_char_term_is_rejected() {
        assert!(validate_term("a").is_err());
    }

    #[test]
    fn two_char_alphabetic_term_is_accepted() {
        assert_eq!(validate_term("ab").expect("accepted"), "ab");
    }

    #[test]
    fn oversized_term_is_rejected() {
        assert!(validate_term(&"x".repeat(101)).is_err());
    }

    #[test]
    fn accented_spanish_term_is_accepted() {
        assert_eq!(
            validate_term("  canción melancólica  ").expect("accepted"),
            "canción melancólica"
        );
    }

    #[test]
    fn control_characters_are_rejected() {
        assert!(validate_term("bad\u{7}term").is_err());
    }

    #[test]
    fn matching_is_case_insensitive_and_collapses_whitespace() {
        let terms = vec![term("Reggaeton", true)];
        let result = apply_terms("nada de REGGAETON por favor", &terms);
        assert_eq!(result.text, "nada de por favor");
        assert_eq!(result.removed, vec!["Reggaeton".to_string()]);
    }

    #[test]
    fn inactive_terms_are_ignored() {
        let terms = vec![term("jazz", false)];
        let result = apply_terms("ponme jazz suave", &terms);
        assert_eq!(result.text, "ponme jazz suave");
        assert!(result.removed.is_empty());
    }

    #[test]
    fn filtering_clean_text_is_identity() {
        let terms = vec![term("banda prohibida", true)];
        let original = "me  gusta   el\njazz"; // odd spacing must survive
        let result = apply_terms(original, &terms);
        assert_eq!(result.text, original);
        assert!(result.removed.is_empty());
    }

    #[test]
    fn second_pass_over_filtered_text_changes_nothing() {
        let terms = vec![term("salsa", true)];
        let first = apply_terms("quiero salsa y más salsa ya", &terms);
        assert_eq!(first.text, "quiero y más ya");

        let second = apply_terms(&first.text, &terms);
        assert_eq!(second.text, first.text);
        assert!(second.removed.is_empty());
    }

    #[test]
    fn accented_matches_fold_case() {
        let terms = vec![term("canción", true)];
        let result = apply_terms("esa CANCIÓN no", &terms);
        assert_eq!(result.text, "esa no");
    }

    #[test]
    fn find_matches_reports_without_mutating() {
        let terms = vec![term("cumbia", true), term("tango", true)];
        let report = find_matches("algo de Cumbia estaría bien", &terms);
        assert!(report.has_matches);
        assert_eq!(report.matched, vec!["cumbia".to_string()]);
    }
}
