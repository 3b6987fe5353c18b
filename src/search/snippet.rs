//! Snippet extraction for content hits

use regex::{Regex, RegexBuilder};
use crate::core::error::{Error, Result};

/// Extracted snippet with its byte range in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Case-insensitive literal matcher for a query phrase. Any run of
/// whitespace in the text matches a single space in the query.
pub fn phrase_matcher(query: &str) -> Result<Regex> {
    let pattern = query
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::InvalidOption(format!("query cannot be matched: {}", e)))
}

/// Window of at most `max_len` bytes centered on `center`, with `...` on
/// each side that was cut.
pub fn extract_snippet(content: &str, center: usize, max_len: usize) -> Snippet {
    if content.len() <= max_len {
        return Snippet {
            text: content.to_string(),
            start: 0,
            end: content.len(),
        };
    }

    let start = center.min(content.len()).saturating_sub(max_len / 2);
    let end = (start + max_len).min(content.len());
    let start = if end == content.len() { end.saturating_sub(max_len) } else { start };

    // Round inward so the window never exceeds max_len
    let start = ceil_char_boundary(content, start);
    let end = floor_char_boundary(content, end).max(start);

    let mut text = content[start..end].to_string();
    if start > 0 {
        text = format!("...{}", text);
    }
    if end < content.len() {
        text.push_str("...");
    }

    Snippet { text, start, end }
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
