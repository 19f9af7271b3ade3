// src/model/mod.rs
//! Data carried through a batch run: records, search candidates, and the
//! per-record decisions made about them.

use crate::types::{ImageType, RecordId, ValidatedUrl};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One flashcard-like record: an id plus named text fields.
///
/// Field order is the host's order and is preserved on write-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: IndexMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.fields.insert(name.into(), content.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// One image search hit, with what is needed to embed and credit it.
///
/// Immutable once fetched; shared between the cache and the selection step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// Search-service identifier of the image.
    pub remote_id: u64,
    pub preview_url: ValidatedUrl,
    pub full_url: ValidatedUrl,
    pub image_type: ImageType,
    /// Credit line, e.g. "Image by jdoe on Pixabay".
    pub attribution: String,
    /// Free-text tags reported by the service; used as alt text.
    pub tags: String,
}

/// How the selection step ended for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    Chosen(Candidate),
    Skipped,
    Aborted,
}

/// Why a record was left untouched without counting as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Source field was empty after stripping markup.
    EmptySource,
    /// The search returned no hits.
    NoResults { query: String },
    /// A human skipped the record in the selection step.
    UserSkipped,
    /// The target field already had content and the run skips filled fields.
    AlreadyFilled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySource => write!(f, "source field is empty"),
            Self::NoResults { query } => write!(f, "no images found for '{}'", query),
            Self::UserSkipped => write!(f, "skipped during selection"),
            Self::AlreadyFilled => write!(f, "target field already has content"),
        }
    }
}

/// Final state of one record after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The target field was rewritten to this content.
    Success { new_content: String },
    Skipped(SkipReason),
    Failed { reason: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_round_trips_through_flat_json() {
        let json = r#"{"id":42,"Source":"chat","Image":""}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_str(), "42");
        assert_eq!(record.field("Source"), Some("chat"));
        assert_eq!(record.field("Image"), Some(""));
        assert_eq!(serde_json::to_string(&record).unwrap(), json);
    }
}
