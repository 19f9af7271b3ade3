// src/config.rs
use crate::api::client::ClientSettings;
use crate::constants::{
    API_KEY_ENV_VAR, DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_BACKOFF, DEFAULT_MIN_REQUEST_INTERVAL, DEFAULT_REQUEST_TIMEOUT, MAX_FETCH_WORKERS,
    MAX_QUERY_LENGTH, PIXABAY_API_URL, PIXABAY_MAX_PER_PAGE, PIXABAY_MIN_PER_PAGE,
};
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::types::{ApiKey, FieldName, ImageType, PlacementPolicy};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about = "Adds Pixabay images to flashcard notes", long_about = None)]
pub struct CommandLineInput {
    /// JSON notes file ({"notes": [...]})
    pub notes_file: String,

    /// Field whose text becomes the search query
    #[arg(short = 's', long, default_value = "Source")]
    pub source_field: String,

    /// Field that receives the image
    #[arg(short = 't', long, default_value = "Image")]
    pub target_field: String,

    /// Image type to search for: photo, illustration, vector or all
    #[arg(long, default_value = "illustration")]
    pub image_type: String,

    /// Image type to retry with when the first search finds nothing
    /// (defaults to photo when searching illustrations)
    #[arg(long)]
    pub fallback_type: Option<String>,

    /// Never retry with a second image type
    #[arg(long, default_value_t = false)]
    pub no_fallback: bool,

    /// Where the image goes: before, after or replace (replace discards the field's content)
    #[arg(long, default_value = "after")]
    pub placement: String,

    /// Choose each image by hand instead of taking the first result
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Language of the source text (two-letter code)
    #[arg(long, default_value = "fr")]
    pub lang: String,

    /// Turn off Pixabay's safe search
    #[arg(long, default_value_t = false)]
    pub no_safe_search: bool,

    /// Results requested per search (3 to 200)
    #[arg(long, default_value_t = 5)]
    pub per_page: u32,

    /// Minimum milliseconds between two API requests
    #[arg(long, default_value_t = DEFAULT_MIN_REQUEST_INTERVAL.as_millis() as u64)]
    pub interval_ms: u64,

    /// Attempts per request before giving up on transient errors
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Concurrent searches (1 to 4)
    #[arg(long, default_value_t = 2)]
    pub concurrency: usize,

    /// Also process notes whose target field already has content
    #[arg(long, default_value_t = false)]
    pub include_filled: bool,

    /// Download images into the media directory instead of linking them
    #[arg(short, long, default_value_t = false)]
    pub download: bool,

    /// Media directory for downloaded images (defaults to "media" next to the notes file)
    #[arg(long)]
    pub media_dir: Option<String>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Resolved run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub api_key: ApiKey,
    pub source_field: FieldName,
    pub target_field: FieldName,
    pub image_type: ImageType,
    pub fallback_image_type: Option<ImageType>,
    pub placement: PlacementPolicy,
    pub interactive: bool,
    pub language: String,
    pub safe_search: bool,
    pub per_page: u32,
    pub min_request_interval: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
    pub concurrency: usize,
    /// Skip records whose target already has content. Ignored for
    /// `Replace`, which exists to overwrite filled fields.
    pub skip_filled: bool,
    pub download: bool,
    pub max_query_len: usize,
    pub notes_file: PathBuf,
    pub media_dir: PathBuf,
    pub verbose: bool,
}

impl RunConfig {
    /// Resolves a complete run configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let api_key = std::env::var(API_KEY_ENV_VAR).map_err(|_| {
            AppError::MissingConfiguration(format!(
                "{} environment variable not set",
                API_KEY_ENV_VAR
            ))
        })?;
        Self::resolve_with_key(cli, api_key)
    }

    /// Same as [`RunConfig::resolve`] with the API key supplied directly.
    pub fn resolve_with_key(cli: CommandLineInput, api_key: String) -> Result<Self, AppError> {
        let api_key = ApiKey::new(api_key)?;
        let placement: PlacementPolicy = cli.placement.parse()?;
        let image_type: ImageType = cli.image_type.parse()?;
        let fallback_image_type = match (&cli.fallback_type, cli.no_fallback) {
            (_, true) => None,
            (Some(t), false) => Some(t.parse::<ImageType>()?),
            (None, false) => default_fallback(image_type),
        }
        .filter(|fallback| *fallback != image_type);

        let notes_file = PathBuf::from(&cli.notes_file);
        let media_dir = cli.media_dir.map(PathBuf::from).unwrap_or_else(|| {
            notes_file
                .parent()
                .map(|p| p.join("media"))
                .unwrap_or_else(|| PathBuf::from("media"))
        });

        Ok(RunConfig {
            api_key,
            source_field: FieldName::new(cli.source_field)?,
            target_field: FieldName::new(cli.target_field)?,
            image_type,
            fallback_image_type,
            placement,
            interactive: cli.interactive,
            language: cli.lang,
            safe_search: !cli.no_safe_search,
            per_page: cli.per_page.clamp(PIXABAY_MIN_PER_PAGE, PIXABAY_MAX_PER_PAGE),
            min_request_interval: Duration::from_millis(cli.interval_ms),
            max_attempts: cli.max_attempts.max(1),
            concurrency: cli.concurrency.clamp(1, MAX_FETCH_WORKERS),
            skip_filled: !cli.include_filled && !placement.is_destructive(),
            download: cli.download,
            notes_file,
            media_dir,
            verbose: cli.verbose,
            ..Self::default()
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: self.initial_backoff,
            max_delay: self.max_backoff,
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: PIXABAY_API_URL.to_string(),
            language: self.language.clone(),
            safe_search: self.safe_search,
            request_timeout: self.request_timeout,
            download_timeout: self.download_timeout,
            retry: self.retry_policy(),
        }
    }

    /// Whether filled target fields are left alone in this run.
    pub fn skips_filled(&self) -> bool {
        self.skip_filled && !self.placement.is_destructive()
    }

    /// Worker count actually used for prefetching.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_FETCH_WORKERS)
    }
}

/// Illustrations are sparse for many words; photos are the usual fallback.
fn default_fallback(primary: ImageType) -> Option<ImageType> {
    match primary {
        ImageType::Illustration => Some(ImageType::Photo),
        _ => None,
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            api_key: ApiKey::new("default_key_for_testing_only")
                .expect("Default API key should be valid"),
            source_field: FieldName::new("Source").expect("Default field name should be valid"),
            target_field: FieldName::new("Image").expect("Default field name should be valid"),
            image_type: ImageType::Illustration,
            fallback_image_type: Some(ImageType::Photo),
            placement: PlacementPolicy::default(),
            interactive: false,
            language: "fr".to_string(),
            safe_search: true,
            per_page: 5,
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            concurrency: 2,
            skip_filled: true,
            download: false,
            max_query_len: MAX_QUERY_LENGTH,
            notes_file: PathBuf::from("notes.json"),
            media_dir: PathBuf::from("media"),
            verbose: false,
        }
    }
}
