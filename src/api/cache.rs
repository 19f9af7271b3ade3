// src/api/cache.rs
//! In-memory candidate cache scoped to one batch run.
//!
//! Keyed by the exact (normalized query, image type) pair. The cache is
//! created when a run starts and dropped with it; nothing is persisted,
//! since search results and their download URLs go stale quickly.

use super::ImageSearch;
use crate::error::AppError;
use crate::model::Candidate;
use crate::query::SearchQuery;
use crate::types::ImageType;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

type CacheKey = (SearchQuery, ImageType);
type CacheSlot = Arc<OnceCell<Arc<Vec<Candidate>>>>;

/// Memoizes search results for the duration of a run.
///
/// Concurrent callers asking for the same key share one slot, so only the
/// first one reaches the network; the rest wait for its result. Empty
/// results are cached too. Errors are not: a failed fetch leaves the slot
/// empty for the next caller.
pub struct CandidateCache {
    inner: Arc<dyn ImageSearch>,
    page_size: u32,
    slots: Mutex<HashMap<CacheKey, CacheSlot>>,
    lookups: AtomicUsize,
    misses: AtomicUsize,
}

/// Cache counters, reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

impl CandidateCache {
    pub fn new(inner: Arc<dyn ImageSearch>, page_size: u32) -> Self {
        Self {
            inner,
            page_size,
            slots: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Returns cached candidates for the key, fetching them on first use.
    ///
    /// Fails with `NoResults` (from cache or network) when the search had
    /// no hits.
    pub async fn get_or_fetch(
        &self,
        query: &SearchQuery,
        image_type: ImageType,
    ) -> Result<Arc<Vec<Candidate>>, AppError> {
        let key = (query.clone(), image_type);
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key).or_default())
        };

        self.lookups.fetch_add(1, Ordering::Relaxed);
        if slot.initialized() {
            log::debug!("Cache hit: '{}' ({})", query, image_type);
        }
        let candidates = slot
            .get_or_try_init(|| self.fetch(query, image_type))
            .await?;

        if candidates.is_empty() {
            return Err(AppError::NoResults {
                query: query.as_str().to_string(),
            });
        }
        Ok(Arc::clone(candidates))
    }

    /// Runs the real search for a cache miss; no hits become an empty entry.
    async fn fetch(
        &self,
        query: &SearchQuery,
        image_type: ImageType,
    ) -> Result<Arc<Vec<Candidate>>, AppError> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("Cache miss: '{}' ({})", query, image_type);
        match self.inner.search(query, image_type, self.page_size).await {
            Ok(candidates) => Ok(Arc::new(candidates)),
            Err(AppError::NoResults { .. }) => Ok(Arc::new(Vec::new())),
            Err(e) => Err(e),
        }
    }

    /// Hits count every lookup answered without a network call of its own,
    /// including callers that waited on a concurrent fetch.
    pub fn stats(&self) -> CacheStats {
        let lookups = self.lookups.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            hits: lookups.saturating_sub(misses),
            misses,
        }
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
