//! Text cleanup helpers.

use regex::Regex;
use std::sync::OnceLock;

fn citation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"【\d+:\d+†source】").expect("citation pattern is valid"))
}

/// Remove file-search citation markers such as `【4:0†source】` and trim.
///
/// Idempotent: cleaning already-clean text returns it unchanged. Removing a
/// marker can splice the text around it into a new marker, so passes repeat
/// until none is left.
pub fn strip_citations(text: &str) -> String {
    let pattern = citation_pattern();
    let mut cleaned = pattern.replace_all(text, "").into_owned();
    while pattern.is_match(&cleaned) {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
