//! Combined run views and aggregate statistics.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Game, MoveRecord, Run, RunStatus};

/// A run together with its game and move trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    /// The run.
    pub run: Run,
    /// The game the run is playing.
    pub game: Game,
    /// Move attempts in `move_index` order.
    pub moves: Vec<MoveRecord>,
}

impl RunView {
    /// Returns `true` while both the run and its game are in progress.
    pub fn is_active(&self) -> bool {
        self.run.is_in_progress() && self.game.is_in_progress()
    }

    /// Status of the run.
    pub fn status(&self) -> RunStatus {
        self.run.status
    }

    /// Most recent move attempt, if any.
    pub fn last_move(&self) -> Option<&MoveRecord> {
        self.moves.last()
    }
}

/// Aggregate counts and rates over every stored run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    total_runs: usize,
    solved_count: usize,
    failed_count: usize,
    in_progress_count: usize,
    /// Mean move count over solved and failed runs.
    average_moves: f64,
    /// Mean latency over every recorded model call.
    average_latency_ms: f64,
    /// `solved / (solved + failed)`.
    success_rate: f64,
}

impl RunStats {
    /// Computes the aggregate from runs with their games and the latency of every call.
    ///
    /// Means over an empty population are `0.0`.
    #[instrument(skip_all)]
    pub fn aggregate<'a>(
        runs: impl IntoIterator<Item = (&'a Run, &'a Game)>,
        latencies: impl IntoIterator<Item = u64>,
    ) -> Self {
        let mut stats = Self::default();
        let mut completed_moves: u64 = 0;

        for (run, game) in runs {
            stats.total_runs += 1;
            match run.status {
                RunStatus::Solved => stats.solved_count += 1,
                RunStatus::Failed => stats.failed_count += 1,
                RunStatus::InProgress => stats.in_progress_count += 1,
                RunStatus::Aborted => {}
            }
            if matches!(run.status, RunStatus::Solved | RunStatus::Failed) {
                completed_moves += u64::from(game.move_count);
            }
        }

        let (latency_total, call_count) = latencies
            .into_iter()
            .fold((0u64, 0u64), |(total, count), ms| (total + ms, count + 1));

        let completed = stats.solved_count + stats.failed_count;
        stats.average_moves = ratio(completed_moves as f64, completed as f64);
        stats.average_latency_ms = ratio(latency_total as f64, call_count as f64);
        stats.success_rate = ratio(stats.solved_count as f64, completed as f64);

        debug!(
            total = stats.total_runs,
            solved = stats.solved_count,
            failed = stats.failed_count,
            success_rate = stats.success_rate,
            "Stats aggregated"
        );
        stats
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
