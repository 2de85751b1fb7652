//! In-process store backed by shared maps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, instrument};

use super::{RunStore, StoreError, TraceRecorder};
use crate::records::{Game, GameId, ModelCallRecord, MoveRecord, Run, RunId};

#[derive(Debug, Default)]
struct Tables {
    runs: HashMap<RunId, Run>,
    games: HashMap<GameId, Game>,
    moves: HashMap<RunId, Vec<MoveRecord>>,
    calls: HashMap<RunId, Vec<ModelCallRecord>>,
}

/// Store that keeps everything in memory. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        debug!("Creating in-memory store");
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::new(format!("Store lock poisoned: {}", e)))
    }
}

impl TraceRecorder for MemoryStore {
    #[instrument(skip(self, record), fields(run_id = %record.run_id, move_index = record.move_index))]
    fn record_move(&self, record: MoveRecord) -> Result<(), StoreError> {
        self.lock()?
            .moves
            .entry(record.run_id)
            .or_default()
            .push(record);
        Ok(())
    }

    #[instrument(skip(self, record), fields(run_id = %record.run_id, request_id = %record.request_id))]
    fn record_model_call(&self, record: ModelCallRecord) -> Result<(), StoreError> {
        self.lock()?
            .calls
            .entry(record.run_id)
            .or_default()
            .push(record);
        Ok(())
    }

    #[instrument(skip(self))]
    fn get_moves(&self, run_id: RunId) -> Result<Vec<MoveRecord>, StoreError> {
        Ok(self.lock()?.moves.get(&run_id).cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    fn get_call_logs(&self, run_id: RunId) -> Result<Vec<ModelCallRecord>, StoreError> {
        Ok(self.lock()?.calls.get(&run_id).cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    fn call_latencies(&self) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .lock()?
            .calls
            .values()
            .flatten()
            .map(|call| call.latency_ms)
            .collect())
    }
}

impl RunStore for MemoryStore {
    #[instrument(skip(self))]
    fn get_run(&self, run_id: RunId) -> Result<Option<Run>, StoreError> {
        Ok(self.lock()?.runs.get(&run_id).cloned())
    }

    #[instrument(skip(self, run), fields(run_id = %run.id, status = %run.status))]
    fn set_run(&self, run: &Run) -> Result<(), StoreError> {
        self.lock()?.runs.insert(run.id, run.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    fn get_game(&self, game_id: GameId) -> Result<Option<Game>, StoreError> {
        Ok(self.lock()?.games.get(&game_id).cloned())
    }

    #[instrument(skip(self, game), fields(game_id = %game.id, status = %game.status))]
    fn set_game(&self, game: &Game) -> Result<(), StoreError> {
        self.lock()?.games.insert(game.id, game.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    fn list_runs(&self) -> Result<Vec<Run>, StoreError> {
        let mut runs: Vec<Run> = self.lock()?.runs.values().cloned().collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(count = runs.len(), "Runs listed");
        Ok(runs)
    }
}
