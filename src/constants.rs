// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Pixabay API boundaries
// ---------------------------------------------------------------------------

/// Search endpoint of the Pixabay image API.
pub const PIXABAY_API_URL: &str = "https://pixabay.com/api/";

/// Environment variable holding the Pixabay API key.
pub const API_KEY_ENV_VAR: &str = "PIXABAY_API_KEY";

/// Pixabay rejects `per_page` values outside 3..=200.
pub const PIXABAY_MIN_PER_PAGE: u32 = 3;
pub const PIXABAY_MAX_PER_PAGE: u32 = 200;

/// Pixabay caps the `q` parameter at 100 characters.
pub const MAX_QUERY_LENGTH: usize = 100;

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Most candidates ever shown to a human for one record.
pub const MAX_PRESENTED_CANDIDATES: usize = 5;

// ---------------------------------------------------------------------------
// Throttling and retry
// ---------------------------------------------------------------------------

/// Minimum gap between two requests to the search service, shared by all workers.
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1000);

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on concurrent candidate fetches. More workers would only
/// queue on the shared rate limiter.
pub const MAX_FETCH_WORKERS: usize = 4;

// ---------------------------------------------------------------------------
// Field content
// ---------------------------------------------------------------------------

/// Separates inserted image markup from the existing field content.
pub const FIELD_DELIMITER: &str = "<br>";

/// Prefix for media files written by the downloader.
pub const MEDIA_FILE_PREFIX: &str = "cardpix";

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
