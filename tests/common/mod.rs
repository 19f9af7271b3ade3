// tests/common/mod.rs
//! In-memory stand-ins for the search service, the picker and media storage.

#![allow(dead_code)]

use cardpix::{
    AppError, Candidate, CandidatePicker, ImageSearch, ImageType, MediaStore, PickerDecision,
    Record, RecordId, RunConfig, SearchQuery, SelectionRequest, ValidatedUrl,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// How the fake search answers a given query text.
#[derive(Debug, Clone)]
pub enum Answer {
    Hits(usize),
    NoResults,
    Unauthorized,
    Throttled,
}

/// Search fake keyed by query text and image type.
///
/// Queries without a scripted answer return three hits.
#[derive(Default)]
pub struct ScriptedSearch {
    answers: HashMap<(String, Option<ImageType>), Answer>,
    calls: Mutex<Vec<(String, ImageType)>>,
    delay: Option<Duration>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same answer for every image type.
    pub fn answer(mut self, query: &str, answer: Answer) -> Self {
        self.answers.insert((query.to_string(), None), answer);
        self
    }

    pub fn answer_for(mut self, query: &str, image_type: ImageType, answer: Answer) -> Self {
        self.answers
            .insert((query.to_string(), Some(image_type)), answer);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, ImageType)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

pub fn candidate(query: &str, index: usize, image_type: ImageType) -> Candidate {
    let slug: String = query
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    Candidate {
        remote_id: index as u64 + 1,
        preview_url: ValidatedUrl::parse(&format!(
            "https://cdn.pixabay.com/photo/{}-{}_150.jpg",
            slug, index
        ))
        .unwrap(),
        full_url: ValidatedUrl::parse(&format!(
            "https://pixabay.com/get/{}-{}_1280.jpg",
            slug, index
        ))
        .unwrap(),
        image_type,
        attribution: format!("Image by user{} on Pixabay", index),
        tags: format!("{}, tag{}", query, index),
    }
}

#[async_trait::async_trait]
impl ImageSearch for ScriptedSearch {
    async fn search(
        &self,
        query: &SearchQuery,
        image_type: ImageType,
        page_size: u32,
    ) -> Result<Vec<Candidate>, AppError> {
        self.calls
            .lock()
            .push((query.as_str().to_string(), image_type));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = query.as_str().to_string();
        let answer = self
            .answers
            .get(&(text.clone(), Some(image_type)))
            .or_else(|| self.answers.get(&(text.clone(), None)))
            .cloned()
            .unwrap_or(Answer::Hits(3));

        match answer {
            Answer::Hits(n) => Ok((0..n.min(page_size as usize))
                .map(|i| candidate(&text, i, image_type))
                .collect()),
            Answer::NoResults => Err(AppError::NoResults { query: text }),
            Answer::Unauthorized => Err(AppError::Auth {
                message: "[ERROR 400] \"key\" is invalid".to_string(),
            }),
            Answer::Throttled => Err(AppError::RateLimitExceeded { attempts: 4 }),
        }
    }
}

/// Picker that replays a fixed list of decisions and remembers what it saw.
pub struct ScriptedPicker {
    decisions: Mutex<VecDeque<PickerDecision>>,
    seen: Mutex<Vec<(RecordId, usize, (usize, usize))>>,
}

impl ScriptedPicker {
    pub fn new(decisions: impl IntoIterator<Item = PickerDecision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// (record, number of candidates shown, position) per prompt.
    pub fn seen(&self) -> Vec<(RecordId, usize, (usize, usize))> {
        self.seen.lock().clone()
    }
}

#[async_trait::async_trait]
impl CandidatePicker for ScriptedPicker {
    async fn pick(&self, request: &SelectionRequest<'_>) -> PickerDecision {
        self.seen.lock().push((
            request.record_id.clone(),
            request.candidates.len(),
            request.position,
        ));
        self.decisions
            .lock()
            .pop_front()
            .unwrap_or(PickerDecision::Abort)
    }
}

/// Media store keeping files in memory.
#[derive(Default)]
pub struct MemoryMedia {
    pub files: Mutex<Vec<(String, usize)>>,
}

#[async_trait::async_trait]
impl MediaStore for MemoryMedia {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        self.files.lock().push((file_name.to_string(), bytes.len()));
        Ok(file_name.to_string())
    }
}

/// Records `1..=n` with the given source texts and an empty image field.
pub fn records(sources: &[&str]) -> Vec<Record> {
    sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            Record::new(i as i64 + 1)
                .with_field("Source", *source)
                .with_field("Image", "")
        })
        .collect()
}

pub fn ids(n: usize) -> Vec<RecordId> {
    (1..=n as i64).map(RecordId::from).collect()
}

/// Non-interactive config with no fallback type.
pub fn config() -> RunConfig {
    RunConfig {
        image_type: ImageType::Photo,
        fallback_image_type: None,
        min_request_interval: Duration::ZERO,
        ..RunConfig::default()
    }
}
