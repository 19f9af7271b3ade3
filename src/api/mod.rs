// src/api/mod.rs
//! Image search API interaction: the ability to find candidate images for a query.
//!
//! Business logic depends on the [`ImageSearch`] trait, never on HTTP
//! details. The HTTP client, the shared rate limiter, the JSON parser and
//! the per-run cache each live in their own module.

pub mod cache;
pub mod client;
pub mod parser;
pub mod rate_limit;

use crate::error::AppError;
use crate::model::Candidate;
use crate::query::SearchQuery;
use crate::types::ImageType;

/// The ability to search a remote image catalogue.
///
/// Each call is a fresh request; results are ordered by relevance as the
/// service returns them.
#[async_trait::async_trait]
pub trait ImageSearch: Send + Sync {
    /// Returns up to `page_size` candidates.
    ///
    /// Fails with `NoResults` when the service has no hits, `Auth` when the
    /// key is rejected, and `RateLimitExceeded` once retries run out.
    async fn search(
        &self,
        query: &SearchQuery,
        image_type: ImageType,
        page_size: u32,
    ) -> Result<Vec<Candidate>, AppError>;
}

pub use cache::CandidateCache;
pub use client::PixabayHttpClient;
pub use rate_limit::RequestLimiter;
