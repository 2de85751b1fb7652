//! Run persistence and the append-only trace.
//!
//! The orchestrator only sees the [`RunStore`] trait, so the in-memory and
//! SQLite backends are interchangeable.

mod error;
mod memory;
mod models;
mod schema;
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::{StorageBackend, StorageSettings};
use crate::records::{Game, GameId, ModelCallRecord, MoveRecord, Run, RunId, RunStats, RunView};

/// Append-only log of move attempts and model calls.
pub trait TraceRecorder: Send + Sync {
    /// Appends a move attempt.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the record cannot be written.
    fn record_move(&self, record: MoveRecord) -> Result<(), StoreError>;

    /// Appends a model call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the record cannot be written.
    fn record_model_call(&self, record: ModelCallRecord) -> Result<(), StoreError>;

    /// Move attempts of a run in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the records cannot be read.
    fn get_moves(&self, run_id: RunId) -> Result<Vec<MoveRecord>, StoreError>;

    /// Model calls of a run in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the records cannot be read.
    fn get_call_logs(&self, run_id: RunId) -> Result<Vec<ModelCallRecord>, StoreError>;

    /// Latency of every recorded model call, across all runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the records cannot be read.
    fn call_latencies(&self) -> Result<Vec<u64>, StoreError>;
}

/// Keyed storage for runs and games, plus the trace.
pub trait RunStore: TraceRecorder {
    /// Looks up a run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    fn get_run(&self, run_id: RunId) -> Result<Option<Run>, StoreError>;

    /// Inserts or replaces a run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the run cannot be written.
    fn set_run(&self, run: &Run) -> Result<(), StoreError>;

    /// Looks up a game.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    fn get_game(&self, game_id: GameId) -> Result<Option<Game>, StoreError>;

    /// Inserts or replaces a game.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the game cannot be written.
    fn set_game(&self, game: &Game) -> Result<(), StoreError>;

    /// Every run, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    fn list_runs(&self) -> Result<Vec<Run>, StoreError>;

    /// The run with its game and move trace, or `None` if either is missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    #[instrument(skip(self))]
    fn get_run_with_game(&self, run_id: RunId) -> Result<Option<RunView>, StoreError> {
        let Some(run) = self.get_run(run_id)? else {
            debug!("Run not found");
            return Ok(None);
        };
        let Some(game) = self.get_game(run.game_id)? else {
            warn!(game_id = %run.game_id, "Run references a missing game");
            return Ok(None);
        };
        let moves = self.get_moves(run_id)?;
        Ok(Some(RunView::new(run, game, moves)))
    }

    /// Every run with its game and trace, newest first.
    ///
    /// Runs whose game is missing are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    #[instrument(skip(self))]
    fn get_all_runs_with_games(&self) -> Result<Vec<RunView>, StoreError> {
        let mut views = Vec::new();
        for run in self.list_runs()? {
            let Some(game) = self.get_game(run.game_id)? else {
                warn!(run_id = %run.id, game_id = %run.game_id, "Skipping run without game");
                continue;
            };
            let moves = self.get_moves(run.id)?;
            views.push(RunView::new(run, game, moves));
        }
        debug!(count = views.len(), "Run views loaded");
        Ok(views)
    }

    /// Aggregate statistics over every run that has a game.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    #[instrument(skip(self))]
    fn get_stats(&self) -> Result<RunStats, StoreError> {
        let mut pairs = Vec::new();
        for run in self.list_runs()? {
            if let Some(game) = self.get_game(run.game_id)? {
                pairs.push((run, game));
            }
        }
        let latencies = self.call_latencies()?;
        Ok(RunStats::aggregate(
            pairs.iter().map(|(run, game)| (run, game)),
            latencies,
        ))
    }
}

/// Opens the backend selected by `settings`.
///
/// # Errors
///
/// Returns [`StoreError`] if the SQLite database cannot be opened or migrated.
#[instrument(skip(settings), fields(backend = ?settings.backend()))]
pub fn open_store(settings: &StorageSettings) -> Result<Arc<dyn RunStore>, StoreError> {
    match settings.backend() {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Sqlite => {
            info!(path = %settings.db_path(), "Using SQLite store");
            Ok(Arc::new(SqliteStore::open(settings.db_path().clone())?))
        }
    }
}
