//! A single benchmark attempt of one model on one game.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::GameId;

/// Unique identifier for a run.
pub type RunId = Uuid;

/// Lifecycle of a run. Transitions out of `InProgress` are final.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// The step loop may still make progress.
    InProgress,
    /// The model reached the goal board.
    Solved,
    /// The run ended on one of the [`FailureKind`] outcomes.
    Failed,
    /// Cancelled from outside the step loop.
    Aborted,
}

impl RunStatus {
    /// Returns `true` for every status except `InProgress`.
    pub fn is_terminal(self) -> bool {
        self != RunStatus::InProgress
    }
}

/// Why a run failed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// The model answer held no recognizable direction.
    ParseError,
    /// The model named a direction the blank cannot take.
    IllegalMove,
    /// Applying the move produced a board that broke the invariant.
    InvalidBoard,
    /// The model provider could not be reached or answered with an error.
    GatewayError,
    /// The move budget ran out before the puzzle was solved.
    BudgetExhausted,
}

/// One model paired with one game under a move budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    #[serde(rename = "runId")]
    pub(crate) id: RunId,
    pub(crate) game_id: GameId,
    pub(crate) model_id: String,
    pub(crate) max_moves: u32,
    pub(crate) status: RunStatus,
    pub(crate) failure: Option<FailureKind>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Run {
    /// Creates a run in progress for the given game.
    #[instrument(skip(model_id), fields(model_id = %model_id))]
    pub fn new(game_id: GameId, model_id: String, max_moves: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            game_id,
            model_id,
            max_moves,
            status: RunStatus::InProgress,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` while the run has not reached a final status.
    pub fn is_in_progress(&self) -> bool {
        self.status == RunStatus::InProgress
    }

    /// Moves the run to a final status.
    ///
    /// Returns `false` and leaves the run untouched if it already finished or
    /// if `status` is `InProgress`.
    #[instrument(skip(self), fields(run_id = %self.id, from = %self.status))]
    pub(crate) fn finish(&mut self, status: RunStatus, failure: Option<FailureKind>) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            warn!(to = %status, "Rejected run status transition");
            return false;
        }
        self.status = status;
        self.failure = failure;
        self.updated_at = Utc::now();
        info!(to = %status, failure = ?failure, "Run finished");
        true
    }

    /// Refreshes `updated_at` after a step that left the run in progress.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_is_monotonic() {
        let mut run = Run::new(Uuid::new_v4(), "m".to_string(), 10);
        assert!(run.finish(RunStatus::Solved, None));
        assert!(!run.finish(RunStatus::Failed, Some(FailureKind::ParseError)));
        assert_eq!(run.status, RunStatus::Solved);
        assert_eq!(run.failure, None);
    }

    #[test]
    fn test_finish_rejects_in_progress_target() {
        let mut run = Run::new(Uuid::new_v4(), "m".to_string(), 10);
        assert!(!run.finish(RunStatus::InProgress, None));
        assert!(run.is_in_progress());
    }

    #[test]
    fn test_failure_kind_wire_names() {
        assert_eq!(FailureKind::ParseError.to_string(), "parse_error");
        assert_eq!(FailureKind::BudgetExhausted.as_ref(), "budget_exhausted");
        assert_eq!(
            serde_json::to_string(&FailureKind::IllegalMove).expect("Serialize"),
            "\"illegal_move\""
        );
        assert_eq!(
            "gateway_error".parse::<FailureKind>().expect("Parse"),
            FailureKind::GatewayError
        );
    }
}
