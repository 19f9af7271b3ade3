// src/query.rs
//! Derives a search query from the text of a record's source field.

use crate::constants::MAX_QUERY_LENGTH;
use crate::error::AppError;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref CLOZE: Regex = Regex::new(r"\{\{c\d+::(.*?)(?:::[^}]*)?\}\}")
        .expect("Failed to compile cloze regex - this is a bug in the code");
    static ref SOUND: Regex = Regex::new(r"\[sound:[^\]]*\]")
        .expect("Failed to compile sound tag regex - this is a bug in the code");
    static ref STRIPPED_BLOCKS: Regex = Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>")
        .expect("Failed to compile block regex - this is a bug in the code");
    static ref TAG: Regex =
        Regex::new(r"(?s)<[^>]*>").expect("Failed to compile tag regex - this is a bug in the code");
    static ref NUMERIC_ENTITY: Regex = Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);")
        .expect("Failed to compile entity regex - this is a bug in the code");
}

/// A normalized, length-bounded search string. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns field text into a [`SearchQuery`].
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    max_len: usize,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(MAX_QUERY_LENGTH)
    }
}

impl QueryBuilder {
    /// Creates a builder capping queries at `max_len` characters (at least 1).
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(1),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Strips markup, collapses whitespace and truncates to the cap.
    ///
    /// Fails with `EmptySource` when nothing is left, which marks the
    /// record as skipped rather than retryable.
    pub fn build(&self, source_text: &str) -> Result<SearchQuery, AppError> {
        let plain = strip_markup(source_text);
        let collapsed = plain.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return Err(AppError::EmptySource);
        }
        Ok(SearchQuery(truncate_on_word(&collapsed, self.max_len)))
    }
}

/// Removes HTML, cloze deletions, sound tags and character entities.
fn strip_markup(text: &str) -> String {
    let text = CLOZE.replace_all(text, "$1");
    let text = SOUND.replace_all(&text, " ");
    let text = STRIPPED_BLOCKS.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    decode_entities(&text)
}

fn decode_entities(text: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| " ".to_string())
    });
    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Cuts `text` to at most `max_chars` characters, backing off to the last
/// word boundary when one exists in the kept part.
fn truncate_on_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let next_is_boundary = text.chars().nth(max_chars).is_some_and(char::is_whitespace);
    if next_is_boundary {
        return cut.trim_end().to_string();
    }
    match cut.rfind(' ') {
        Some(pos) if pos > 0 => cut[..pos].trim_end().to_string(),
        _ => cut,
    }
}
