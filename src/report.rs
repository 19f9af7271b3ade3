// src/report.rs
//! The result of one batch run.

use crate::api::cache::CacheStats;
use crate::model::RunOutcome;
use crate::types::RecordId;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

/// Why a run stopped before reaching the last record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunHalt {
    /// The search service rejected the API key.
    Auth { message: String },
    /// A person aborted during selection.
    Aborted,
    /// The host store could not list or persist records.
    Store { message: String },
}

impl std::fmt::Display for RunHalt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth { message } => write!(f, "authentication failed: {}", message),
            Self::Aborted => write!(f, "aborted by user"),
            Self::Store { message } => write!(f, "record store failure: {}", message),
        }
    }
}

/// Outcome of a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReport {
    pub record_id: RecordId,
    pub outcome: RunOutcome,
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

/// Summary of a batch run.
///
/// Entries are in processing order. A halted run holds entries only for
/// the records reached before the halt.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub entries: Vec<RecordReport>,
    pub stats: RunStats,
    pub halt: Option<RunHalt>,
    pub cache: CacheStats,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
            stats: RunStats::default(),
            halt: None,
            cache: CacheStats::default(),
        }
    }

    /// Appends the outcome of one record.
    pub fn record(&mut self, record_id: RecordId, outcome: RunOutcome) {
        match &outcome {
            RunOutcome::Success { .. } => self.stats.succeeded += 1,
            RunOutcome::Skipped(_) => self.stats.skipped += 1,
            RunOutcome::Failed { .. } => self.stats.failed += 1,
        }
        self.entries.push(RecordReport { record_id, outcome });
    }

    pub fn halted(&mut self, halt: RunHalt) {
        self.halt = Some(halt);
    }

    pub fn finish(mut self, cache: CacheStats) -> Self {
        self.cache = cache;
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_some()
    }

    /// Outcome recorded for `record_id`, if it was reached.
    pub fn outcome_of(&self, record_id: &RecordId) -> Option<&RunOutcome> {
        self.entries
            .iter()
            .find(|e| &e.record_id == record_id)
            .map(|e| &e.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordReport> {
        self.entries.iter().filter(|e| e.outcome.is_failed())
    }

    /// Run duration, once finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// Multi-line, human-readable summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Processed {} record(s): {} succeeded, {} skipped, {} failed",
            self.stats.total(),
            self.stats.succeeded,
            self.stats.skipped,
            self.stats.failed
        );
        for entry in &self.entries {
            let line = match &entry.outcome {
                RunOutcome::Success { .. } => "image added".to_string(),
                RunOutcome::Skipped(reason) => format!("skipped: {}", reason),
                RunOutcome::Failed { reason } => format!("failed: {}", reason),
            };
            let _ = writeln!(out, "  [{}] {}", entry.record_id, line);
        }
        if let Some(halt) = &self.halt {
            let _ = writeln!(out, "Run halted: {}", halt);
        }
        let _ = write!(
            out,
            "Searches: {} cached, {} fetched",
            self.cache.hits, self.cache.misses
        );
        if let Some(elapsed) = self.elapsed() {
            let _ = write!(out, " in {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
        }
        out
    }
}
