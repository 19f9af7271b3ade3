// src/runner.rs
//! Batch orchestration: query, candidates, selection, mutation, per record.
//!
//! Candidate resolution runs ahead of the current record on a small,
//! order-preserving worker pool. Selection and field writes happen one
//! record at a time, in input order.

use crate::api::{CandidateCache, ImageSearch};
use crate::config::RunConfig;
use crate::error::{AppError, OutcomeKind};
use crate::media::{copy_to_media, ImageDownloader};
use crate::model::{Candidate, RunOutcome, SelectionResult, SkipReason};
use crate::mutator::{render_markup, FieldMutator};
use crate::pipeline::{MediaStore, RecordStore};
use crate::query::{QueryBuilder, SearchQuery};
use crate::report::{RunHalt, RunReport};
use crate::selection::{select_with, CandidatePicker};
use crate::types::RecordId;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Everything resolved for a record before anyone looks at it.
enum Prepared {
    Ready {
        query: SearchQuery,
        current: String,
        candidates: Arc<Vec<Candidate>>,
    },
    AlreadyFilled,
}

/// Downloader and storage used when images are copied locally.
#[derive(Clone)]
struct MediaCopier {
    downloader: Arc<dyn ImageDownloader>,
    store: Arc<dyn MediaStore>,
}

/// Runs the image pipeline over a list of records.
pub struct BatchRunner {
    config: RunConfig,
    search: Arc<dyn ImageSearch>,
    records: Arc<dyn RecordStore>,
    picker: Option<Arc<dyn CandidatePicker>>,
    media: Option<MediaCopier>,
    query_builder: QueryBuilder,
    mutator: FieldMutator,
}

impl BatchRunner {
    pub fn new(
        config: RunConfig,
        search: Arc<dyn ImageSearch>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let query_builder = QueryBuilder::new(config.max_query_len);
        Self {
            config,
            search,
            records,
            picker: None,
            media: None,
            query_builder,
            mutator: FieldMutator::default(),
        }
    }

    /// Picker consulted for every record when the config is interactive.
    pub fn with_picker(mut self, picker: Arc<dyn CandidatePicker>) -> Self {
        self.picker = Some(picker);
        self
    }

    /// Copies chosen images into `store` and embeds the local name.
    pub fn with_media(
        mut self,
        downloader: Arc<dyn ImageDownloader>,
        store: Arc<dyn MediaStore>,
    ) -> Self {
        self.media = Some(MediaCopier { downloader, store });
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs over the records the host reports as selected.
    pub async fn run_selected(&self) -> RunReport {
        match self.records.list_selected_records() {
            Ok(ids) => self.run(&ids).await,
            Err(e) => {
                log::error!("Could not list records: {}", e);
                let mut report = RunReport::new();
                report.halted(RunHalt::Store {
                    message: e.to_string(),
                });
                report.finish(Default::default())
            }
        }
    }

    /// Processes `records` in order and reports one outcome per record reached.
    ///
    /// Record-level failures are reported and the run moves on. A rejected
    /// API key or an abort records a failure for the current record and
    /// stops the run; earlier writes are kept.
    pub async fn run(&self, records: &[RecordId]) -> RunReport {
        let mut report = RunReport::new();
        let cache = CandidateCache::new(Arc::clone(&self.search), self.config.per_page);
        let interactive = self.interactive_picker();
        let total = records.len();

        log::info!(
            "Starting run over {} record(s): {} -> {} ({}, placement {})",
            total,
            self.config.source_field,
            self.config.target_field,
            self.config.image_type,
            self.config.placement
        );

        {
            let cache = &cache;
            let mut prepared = std::pin::pin!(stream::iter(records)
                .map(|id| self.prepare(cache, id))
                .buffered(self.config.effective_concurrency()));

            for (index, record_id) in records.iter().enumerate() {
                let Some(prepared) = prepared.next().await else {
                    break;
                };
                let position = (index + 1, total);
                let result = match prepared {
                    Ok(Prepared::AlreadyFilled) => {
                        Ok(RunOutcome::Skipped(SkipReason::AlreadyFilled))
                    }
                    Ok(Prepared::Ready {
                        query,
                        current,
                        candidates,
                    }) => {
                        self.complete(record_id, &query, &current, &candidates, interactive, position)
                            .await
                    }
                    Err(e) => Err(e),
                };

                match result {
                    Ok(outcome) => {
                        log_outcome(record_id, &outcome);
                        report.record(record_id.clone(), outcome);
                    }
                    Err(e) if e.is_fatal() => {
                        log::error!("Record {}: {}; halting run", record_id, e);
                        report.record(record_id.clone(), outcome_for_error(&e));
                        report.halted(halt_for(e));
                        break;
                    }
                    Err(e) => {
                        let outcome = outcome_for_error(&e);
                        log_outcome(record_id, &outcome);
                        report.record(record_id.clone(), outcome);
                    }
                }
            }
        }

        let report = report.finish(cache.stats());
        log::info!(
            "Run finished: {} succeeded, {} skipped, {} failed{}",
            report.stats.succeeded,
            report.stats.skipped,
            report.stats.failed,
            if report.is_halted() { " (halted)" } else { "" }
        );
        report
    }

    fn interactive_picker(&self) -> Option<&dyn CandidatePicker> {
        match (&self.picker, self.config.interactive) {
            (Some(picker), true) => Some(picker.as_ref()),
            (None, true) => {
                log::warn!("Interactive run without a picker; taking the first candidate");
                None
            }
            _ => None,
        }
    }

    async fn prepare(&self, cache: &CandidateCache, id: &RecordId) -> Result<Prepared, AppError> {
        // A missing target field is created on write.
        let current = match self.records.get_field(id, &self.config.target_field) {
            Ok(content) => content,
            Err(AppError::FieldMissing { .. }) => String::new(),
            Err(e) => return Err(e),
        };
        if self.config.skips_filled() && !current.trim().is_empty() {
            return Ok(Prepared::AlreadyFilled);
        }

        let source = self.records.get_field(id, &self.config.source_field)?;
        let query = self.query_builder.build(&source)?;
        log::debug!("Record {}: query '{}'", id, query);
        let candidates = self.resolve_candidates(cache, &query).await?;
        Ok(Prepared::Ready {
            query,
            current,
            candidates,
        })
    }

    /// Searches the configured type, then the fallback type if nothing was found.
    async fn resolve_candidates(
        &self,
        cache: &CandidateCache,
        query: &SearchQuery,
    ) -> Result<Arc<Vec<Candidate>>, AppError> {
        let primary = cache.get_or_fetch(query, self.config.image_type).await;
        match (primary, self.config.fallback_image_type) {
            (Err(AppError::NoResults { .. }), Some(fallback)) => {
                log::info!(
                    "No {} found for '{}', trying {}",
                    self.config.image_type,
                    query,
                    fallback
                );
                cache.get_or_fetch(query, fallback).await
            }
            (result, _) => result,
        }
    }

    async fn complete(
        &self,
        id: &RecordId,
        query: &SearchQuery,
        current: &str,
        candidates: &[Candidate],
        picker: Option<&dyn CandidatePicker>,
        position: (usize, usize),
    ) -> Result<RunOutcome, AppError> {
        let selection = match picker {
            Some(picker) => select_with(picker, id, query, candidates.to_vec(), position).await?,
            None => candidates
                .first()
                .cloned()
                .map(SelectionResult::Chosen)
                .ok_or_else(|| AppError::NoResults {
                    query: query.to_string(),
                })?,
        };

        let candidate = match selection {
            SelectionResult::Chosen(candidate) => candidate,
            SelectionResult::Skipped => return Ok(RunOutcome::Skipped(SkipReason::UserSkipped)),
            SelectionResult::Aborted => return Err(AppError::Aborted),
        };

        let local_name = match &self.media {
            Some(media) => Some(
                copy_to_media(
                    media.downloader.as_ref(),
                    media.store.as_ref(),
                    &candidate.full_url,
                    query,
                )
                .await?,
            ),
            None => None,
        };

        let markup = render_markup(&candidate, local_name.as_deref());
        let new_content = self
            .mutator
            .apply_markup(current, &markup, self.config.placement);
        self.records
            .set_field(id, &self.config.target_field, &new_content)?;
        Ok(RunOutcome::Success { new_content })
    }
}

fn outcome_for_error(err: &AppError) -> RunOutcome {
    match (err.outcome_kind(), err) {
        (OutcomeKind::Skipped, AppError::NoResults { query }) => {
            RunOutcome::Skipped(SkipReason::NoResults {
                query: query.clone(),
            })
        }
        (OutcomeKind::Skipped, _) => RunOutcome::Skipped(SkipReason::EmptySource),
        (OutcomeKind::Failed, AppError::Aborted) => RunOutcome::Failed {
            reason: "aborted".to_string(),
        },
        (OutcomeKind::Failed, e) => RunOutcome::Failed {
            reason: e.to_string(),
        },
    }
}

fn halt_for(err: AppError) -> RunHalt {
    match err {
        AppError::Auth { message } => RunHalt::Auth { message },
        _ => RunHalt::Aborted,
    }
}

fn log_outcome(id: &RecordId, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Success { .. } => log::info!("Record {}: image added", id),
        RunOutcome::Skipped(reason) => log::info!("Record {}: skipped ({})", id, reason),
        RunOutcome::Failed { reason } => log::warn!("Record {}: failed ({})", id, reason),
    }
}
