// src/mutator.rs
//! Writes a chosen image into a record field's content.
//!
//! All functions here are pure: the same content, candidate and policy
//! always give the same result. Applying twice with `Before`/`After`
//! inserts the image twice; callers that re-run over records avoid this
//! by skipping filled target fields.

use crate::constants::FIELD_DELIMITER;
use crate::model::Candidate;
use crate::types::PlacementPolicy;

/// Combines image markup with existing field content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMutator {
    delimiter: String,
}

impl Default for FieldMutator {
    fn default() -> Self {
        Self::new(FIELD_DELIMITER)
    }
}

impl FieldMutator {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    /// Embeds the candidate's full-resolution URL according to `policy`.
    pub fn apply(&self, current: &str, candidate: &Candidate, policy: PlacementPolicy) -> String {
        self.apply_markup(current, &render_markup(candidate, None), policy)
    }

    /// Embeds already-rendered markup according to `policy`.
    ///
    /// `Before`/`After` keep `current` intact and join it with the
    /// delimiter; an empty field just receives the markup. `Replace`
    /// returns the markup alone.
    pub fn apply_markup(&self, current: &str, markup: &str, policy: PlacementPolicy) -> String {
        match policy {
            PlacementPolicy::Replace => markup.to_string(),
            _ if current.is_empty() => markup.to_string(),
            PlacementPolicy::Before => format!("{}{}{}", markup, self.delimiter, current),
            PlacementPolicy::After => format!("{}{}{}", current, self.delimiter, markup),
        }
    }

    /// Recovers the original content from a `Before`/`After` result.
    ///
    /// Returns `None` when `mutated` was not produced from `markup` with
    /// that policy, or when the policy was `Replace` (nothing to recover).
    pub fn strip_inserted(
        &self,
        mutated: &str,
        markup: &str,
        policy: PlacementPolicy,
    ) -> Option<String> {
        if policy == PlacementPolicy::Replace {
            return None;
        }
        if mutated == markup {
            return Some(String::new());
        }
        match policy {
            PlacementPolicy::Before => mutated
                .strip_prefix(markup)
                .and_then(|rest| rest.strip_prefix(self.delimiter.as_str()))
                .map(str::to_string),
            PlacementPolicy::After => mutated
                .strip_suffix(markup)
                .and_then(|rest| rest.strip_suffix(self.delimiter.as_str()))
                .map(str::to_string),
            PlacementPolicy::Replace => None,
        }
    }
}

/// Renders the HTML for one image with its credit line.
///
/// `local_name` replaces the remote URL when the image was copied into
/// host media storage.
pub fn render_markup(candidate: &Candidate, local_name: Option<&str>) -> String {
    let src = local_name.unwrap_or_else(|| candidate.full_url.as_str());
    let alt = if candidate.tags.trim().is_empty() {
        candidate.attribution.as_str()
    } else {
        candidate.tags.as_str()
    };
    format!(
        "<div class=\"cardpix\"><img src=\"{}\" alt=\"{}\"><br><small>{}</small></div>",
        escape_html(src),
        escape_html(alt),
        escape_html(&candidate.attribution)
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
