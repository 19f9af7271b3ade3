// src/lib.rs
//! cardpix library: finds Pixabay images for flashcard records and writes
//! them into a chosen field.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ValidationError`
//! - **Configuration**: `RunConfig`, `CommandLineInput`
//! - **Domain model**: `Record`, `Candidate`, `RunOutcome`, `SkipReason`
//! - **Domain types**: `ApiKey`, `FieldName`, `ImageType`, `PlacementPolicy`, `RecordId`
//! - **Search**: the `ImageSearch` trait, `PixabayHttpClient`, `CandidateCache`
//! - **Pipeline**: `QueryBuilder`, `SelectionController`, `FieldMutator`, `BatchRunner`
//! - **Host capabilities**: `RecordStore`, `MediaStore`, `CandidatePicker`

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod error_recovery;
pub mod media;
pub mod model;
pub mod mutator;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod runner;
pub mod selection;
pub mod store;
pub mod terminal;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, OutcomeKind, SearchErrorCode};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, RunConfig};

// --- Domain Model ---
pub use crate::model::{Candidate, Record, RunOutcome, SelectionResult, SkipReason};

// --- Domain Types ---
pub use crate::types::{ApiKey, FieldName, ImageType, PlacementPolicy, RecordId, ValidatedUrl};

// --- Search ---
pub use crate::api::{
    cache::CacheStats, client::ClientSettings, CandidateCache, ImageSearch, PixabayHttpClient,
    RequestLimiter,
};

// --- Pipeline ---
pub use crate::error_recovery::RetryPolicy;
pub use crate::media::{DirectoryMediaStore, DownloadedImage, ImageDownloader};
pub use crate::mutator::FieldMutator;
pub use crate::query::{QueryBuilder, SearchQuery};
pub use crate::report::{RecordReport, RunHalt, RunReport, RunStats};
pub use crate::runner::BatchRunner;
pub use crate::selection::{
    CandidatePicker, PickerDecision, SelectionController, SelectionRequest, SelectionState,
};
pub use crate::store::JsonRecordStore;
pub use crate::terminal::TerminalPicker;

// --- Host Capability Traits ---
pub use crate::pipeline::{MediaStore, RecordStore};
