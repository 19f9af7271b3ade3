// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! Each variant says what went wrong and how far the failure reaches:
//! a single record, or the whole batch run.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Pixabay HTTP failures as a typed vocabulary.
///
/// The search API reports failures through the HTTP status alone (the body
/// is a short plain-text message), so the status is the only signal used
/// to decide between retrying, failing the record, or halting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchErrorCode {
    /// Invalid or missing API key (401/403)
    Unauthorized,
    /// Too many requests (429)
    RateLimited,
    /// Malformed query or parameter (400)
    BadRequest,
    /// Remote failure (5xx)
    ServerError(u16),
    /// Any other non-success status
    HttpStatus(u16),
}

impl SearchErrorCode {
    /// Classifies an HTTP status code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            429 => Self::RateLimited,
            400 => Self::BadRequest,
            500..=599 => Self::ServerError(status),
            other => Self::HttpStatus(other),
        }
    }

    /// Whether this failure is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::ServerError(_))
    }
}

impl fmt::Display for SearchErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::ServerError(code) => write!(f, "server_error_{}", code),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Source field is empty after stripping markup")]
    EmptySource,

    #[error("Search API rejected the API key: {message}")]
    Auth { message: String },

    #[error("Search API rate limit still exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    #[error("No images found for '{query}'")]
    NoResults { query: String },

    #[error("Selection index {index} is out of range ({available} candidates presented)")]
    SelectionRange { index: usize, available: usize },

    #[error("Run aborted by user")]
    Aborted,

    #[error("Cannot {action} while selection is {state}")]
    InvalidSelectionState {
        action: &'static str,
        state: &'static str,
    },

    #[error("Search API rejected the request: {message}")]
    BadRequest { message: String },

    #[error("Search API returned an error ({code}): {message}")]
    SearchService {
        code: SearchErrorCode,
        message: String,
        /// Server-supplied wait hint (`Retry-After`), if any.
        retry_after: Option<Duration>,
    },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Record {record} has no field named '{field}'")]
    FieldMissing { record: String, field: String },

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Media store error: {0}")]
    Media(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error for {path}: {source}")]
    JsonParseError {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// How a record-level error is reported in the run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Skipped,
    Failed,
}

impl AppError {
    /// Builds the error for a non-success HTTP response.
    ///
    /// Pixabay answers a bad key with a 400 whose body names the `key`
    /// parameter; that case is an auth failure, not a bad request.
    pub fn from_status(status: u16, message: String, retry_after: Option<Duration>) -> Self {
        match SearchErrorCode::from_http_status(status) {
            SearchErrorCode::Unauthorized => AppError::Auth { message },
            SearchErrorCode::BadRequest if names_key_parameter(&message) => {
                AppError::Auth { message }
            }
            SearchErrorCode::BadRequest => AppError::BadRequest { message },
            code => AppError::SearchService {
                code,
                message,
                retry_after,
            },
        }
    }

    /// Whether the failure is transient and may succeed when retried.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::SearchService { code, .. } => code.is_retryable(),
            AppError::Timeout(_) => true,
            AppError::NetworkFailure(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            _ => false,
        }
    }

    /// Whether this error halts the whole batch run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Auth { .. } | AppError::Aborted)
    }

    /// Whether the failure came from the remote service throttling us.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            AppError::SearchService {
                code: SearchErrorCode::RateLimited,
                ..
            }
        )
    }

    /// Server-supplied retry hint, when the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AppError::SearchService { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Maps a record-level error onto the outcome it produces.
    ///
    /// Missing input (empty source, no hits) skips the record; everything
    /// else counts as a failure.
    pub fn outcome_kind(&self) -> OutcomeKind {
        match self {
            AppError::EmptySource | AppError::NoResults { .. } => OutcomeKind::Skipped,
            _ => OutcomeKind::Failed,
        }
    }
}

fn names_key_parameter(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("\"key\"") || message.contains("api key")
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
