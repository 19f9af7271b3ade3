// src/selection.rs
//! Human-in-the-loop choice among the candidates found for one record.
//!
//! [`SelectionController`] is the per-record state machine:
//!
//! ```text
//! Idle --present--> Presenting --choose(i)--> Chosen
//!                       |      --skip-------> Skipped
//!   (any non-terminal) -+------abort--------> Aborted
//! ```
//!
//! A UI drives it through a [`CandidatePicker`]. The picker call is the
//! only point where a batch run waits on a person.

use crate::constants::MAX_PRESENTED_CANDIDATES;
use crate::error::AppError;
use crate::model::{Candidate, SelectionResult};
use crate::query::SearchQuery;
use crate::types::RecordId;

/// Where the controller currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Presenting(Vec<Candidate>),
    Chosen { index: usize, candidate: Candidate },
    Skipped,
    Aborted,
}

impl SelectionState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Presenting(_) => "presenting",
            Self::Chosen { .. } => "chosen",
            Self::Skipped => "skipped",
            Self::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Chosen { .. } | Self::Skipped | Self::Aborted)
    }
}

/// State machine for one record's selection.
#[derive(Debug, Clone)]
pub struct SelectionController {
    state: SelectionState,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionController {
    pub fn new() -> Self {
        Self {
            state: SelectionState::Idle,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Candidates currently on offer, if presenting.
    pub fn presented(&self) -> &[Candidate] {
        match &self.state {
            SelectionState::Presenting(candidates) => candidates,
            _ => &[],
        }
    }

    /// Offers up to five candidates. Valid only from `Idle`.
    pub fn present(&mut self, mut candidates: Vec<Candidate>) -> Result<(), AppError> {
        self.expect_state("present", |s| matches!(s, SelectionState::Idle))?;
        candidates.truncate(MAX_PRESENTED_CANDIDATES);
        self.state = SelectionState::Presenting(candidates);
        Ok(())
    }

    /// Picks the candidate at `index`.
    ///
    /// An index outside the presented list fails with `SelectionRange` and
    /// leaves the controller presenting.
    pub fn choose(&mut self, index: usize) -> Result<&Candidate, AppError> {
        let available = match &self.state {
            SelectionState::Presenting(candidates) => candidates.len(),
            other => {
                return Err(AppError::InvalidSelectionState {
                    action: "choose",
                    state: other.name(),
                })
            }
        };
        if index >= available {
            return Err(AppError::SelectionRange { index, available });
        }

        let previous = std::mem::replace(&mut self.state, SelectionState::Idle);
        if let SelectionState::Presenting(mut candidates) = previous {
            let candidate = candidates.swap_remove(index);
            self.state = SelectionState::Chosen { index, candidate };
        }
        match &self.state {
            SelectionState::Chosen { candidate, .. } => Ok(candidate),
            other => Err(AppError::InvalidSelectionState {
                action: "choose",
                state: other.name(),
            }),
        }
    }

    /// Leaves the record untouched. Valid only while presenting.
    pub fn skip(&mut self) -> Result<(), AppError> {
        self.expect_state("skip", |s| matches!(s, SelectionState::Presenting(_)))?;
        self.state = SelectionState::Skipped;
        Ok(())
    }

    /// Stops the whole batch after this record. Valid from any non-terminal state.
    pub fn abort(&mut self) -> Result<(), AppError> {
        self.expect_state("abort", |s| !s.is_terminal())?;
        self.state = SelectionState::Aborted;
        Ok(())
    }

    /// The outcome, once the controller has reached a terminal state.
    pub fn result(&self) -> Option<SelectionResult> {
        match &self.state {
            SelectionState::Chosen { candidate, .. } => {
                Some(SelectionResult::Chosen(candidate.clone()))
            }
            SelectionState::Skipped => Some(SelectionResult::Skipped),
            SelectionState::Aborted => Some(SelectionResult::Aborted),
            SelectionState::Idle | SelectionState::Presenting(_) => None,
        }
    }

    fn expect_state(
        &self,
        action: &'static str,
        allowed: impl Fn(&SelectionState) -> bool,
    ) -> Result<(), AppError> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(AppError::InvalidSelectionState {
                action,
                state: self.state.name(),
            })
        }
    }
}

/// What a human decided for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerDecision {
    Choose(usize),
    Skip,
    Abort,
}

/// Everything a UI needs to show for one record.
#[derive(Debug)]
pub struct SelectionRequest<'a> {
    pub record_id: &'a RecordId,
    pub query: &'a SearchQuery,
    pub candidates: &'a [Candidate],
    /// 1-based position of the record in the batch, and the batch size.
    pub position: (usize, usize),
}

/// A UI that asks a person to pick a candidate.
#[async_trait::async_trait]
pub trait CandidatePicker: Send + Sync {
    async fn pick(&self, request: &SelectionRequest<'_>) -> PickerDecision;
}

/// Runs one record's selection through `picker`.
///
/// A decision naming a candidate that was not presented fails with
/// `SelectionRange`.
pub async fn select_with(
    picker: &dyn CandidatePicker,
    record_id: &RecordId,
    query: &SearchQuery,
    candidates: Vec<Candidate>,
    position: (usize, usize),
) -> Result<SelectionResult, AppError> {
    let mut controller = SelectionController::new();
    controller.present(candidates)?;

    let decision = picker
        .pick(&SelectionRequest {
            record_id,
            query,
            candidates: controller.presented(),
            position,
        })
        .await;
    log::debug!("Record {}: selection decision {:?}", record_id, decision);

    match decision {
        PickerDecision::Choose(index) => {
            controller.choose(index)?;
        }
        PickerDecision::Skip => controller.skip()?,
        PickerDecision::Abort => controller.abort()?,
    }

    controller.result().ok_or(AppError::InvalidSelectionState {
        action: "finish",
        state: "presenting",
    })
}
