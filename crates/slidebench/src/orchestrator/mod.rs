//! Run orchestration: initialization, the single step, and the step loop.
//!
//! A step performs at most one model call and at most one board mutation.
//! Every bad model outcome ends the run as `failed` with the cause recorded
//! in the trace; only store failures surface as [`OrchestratorError`].

mod error;
mod locks;

pub use error::OrchestratorError;
pub use locks::RunLocks;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use slidebench_puzzle::{Board, Direction, Scrambler};
use tracing::{debug, info, instrument, warn};

use crate::config::RunConfig;
use crate::gateway::ModelGateway;
use crate::notify::{NotificationSink, RunEvent};
use crate::records::{
    FailureKind, Game, GameStatus, ModelCallRecord, MoveRecord, Run, RunId, RunStats, RunStatus,
    RunView,
};
use crate::store::RunStore;

/// What became of a parsed suggestion.
enum MoveOutcome {
    Applied(Board),
    Rejected(FailureKind),
}

/// Drives runs against a model gateway and persists every step.
pub struct Orchestrator {
    store: Arc<dyn RunStore>,
    gateway: Arc<dyn ModelGateway>,
    sink: Arc<dyn NotificationSink>,
    scrambler: Mutex<Scrambler>,
    locks: RunLocks,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator that scrambles from operating-system entropy.
    #[instrument(skip_all)]
    pub fn new(
        store: Arc<dyn RunStore>,
        gateway: Arc<dyn ModelGateway>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_scrambler(store, gateway, sink, Scrambler::from_entropy())
    }

    /// Creates an orchestrator whose scrambles are reproducible.
    #[instrument(skip(store, gateway, sink))]
    pub fn with_seed(
        store: Arc<dyn RunStore>,
        gateway: Arc<dyn ModelGateway>,
        sink: Arc<dyn NotificationSink>,
        seed: u64,
    ) -> Self {
        Self::with_scrambler(store, gateway, sink, Scrambler::seeded(seed))
    }

    fn with_scrambler(
        store: Arc<dyn RunStore>,
        gateway: Arc<dyn ModelGateway>,
        sink: Arc<dyn NotificationSink>,
        scrambler: Scrambler,
    ) -> Self {
        info!("Creating orchestrator");
        Self {
            store,
            gateway,
            sink,
            scrambler: Mutex::new(scrambler),
            locks: RunLocks::new(),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    /// Scrambles a new game and creates a run for it. No model call happens.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if the records cannot be stored.
    #[instrument(skip(self, config), fields(model_id = %config.model_id(), size = config.size()))]
    pub fn initialize_run(&self, config: &RunConfig) -> Result<RunView, OrchestratorError> {
        let board = self
            .scrambler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .scramble(*config.size(), *config.scramble_depth());

        let game = Game::new(board);
        let run = Run::new(game.id, config.model_id().clone(), *config.max_moves());

        self.store.set_game(&game)?;
        self.store.set_run(&run)?;
        info!(run_id = %run.id, game_id = %game.id, "Run initialized");

        let view = RunView::new(run, game, Vec::new());
        self.sink.publish(RunEvent::RunCreated(view.clone()));
        self.publish_stats();
        Ok(view)
    }

    /// Performs one step of the run.
    ///
    /// Returns `None` for an unknown run. A run that already finished is
    /// returned unchanged, without records or events.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if the store fails.
    #[instrument(skip(self))]
    pub async fn step(&self, run_id: RunId) -> Result<Option<RunView>, OrchestratorError> {
        let _guard = self.locks.acquire(run_id).await;

        let Some(view) = self.store.get_run_with_game(run_id)? else {
            debug!("Step on unknown run");
            self.locks.release(run_id);
            return Ok(None);
        };
        if !view.is_active() {
            debug!(status = %view.run.status, game_status = %view.game.status, "Step on finished run");
            self.locks.release(run_id);
            return Ok(Some(view));
        }

        let RunView {
            mut run, mut game, ..
        } = view;

        let remaining = run.max_moves.saturating_sub(game.move_count);
        if remaining == 0 {
            info!(move_count = game.move_count, "Move budget exhausted");
            run.finish(RunStatus::Failed, Some(FailureKind::BudgetExhausted));
            self.store.set_run(&run)?;
            return self.conclude(run_id).map(Some);
        }

        let reply = match self
            .gateway
            .suggest_move(&game.current_board, &run.model_id, remaining)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Gateway call failed");
                self.store
                    .record_model_call(ModelCallRecord::from_failure(&run, &e))?;
                run.finish(RunStatus::Failed, Some(FailureKind::GatewayError));
                self.store.set_run(&run)?;
                return self.conclude(run_id).map(Some);
            }
        };

        self.store
            .record_model_call(ModelCallRecord::from_reply(&run, &reply))?;

        let record = MoveRecord::begin(&run, &game, &reply);
        let record = match evaluate(&game.current_board, reply.parsed_move) {
            MoveOutcome::Applied(next) => {
                game.commit(next.clone());
                if game.status == GameStatus::Solved {
                    run.finish(RunStatus::Solved, None);
                } else {
                    run.touch();
                }
                record.accept(next)
            }
            MoveOutcome::Rejected(kind) => {
                if kind == FailureKind::InvalidBoard {
                    game.mark_error();
                }
                run.finish(RunStatus::Failed, Some(kind));
                record.reject(kind)
            }
        };

        info!(
            move_index = record.move_index,
            suggested = ?record.suggested_move,
            legal = record.is_legal,
            status = %run.status,
            "Step recorded"
        );

        self.store.record_move(record)?;
        self.store.set_game(&game)?;
        self.store.set_run(&run)?;
        self.conclude(run_id).map(Some)
    }

    /// Steps the run until it finishes, pausing `delay` between steps.
    ///
    /// When the loop stops because the budget is spent, one more step marks
    /// the run as `failed` with [`FailureKind::BudgetExhausted`]. Returns
    /// `None` for an unknown run.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if the store fails.
    #[instrument(skip(self))]
    pub async fn run_to_completion(
        &self,
        run_id: RunId,
        delay: Duration,
    ) -> Result<Option<RunView>, OrchestratorError> {
        let Some(mut view) = self.store.get_run_with_game(run_id)? else {
            return Ok(None);
        };

        while view.is_active() && view.game.move_count < view.run.max_moves {
            let Some(next) = self.step(run_id).await? else {
                return Ok(None);
            };
            view = next;
            if view.is_active() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        if view.is_active() {
            if let Some(next) = self.step(run_id).await? {
                view = next;
            }
        }

        info!(
            status = %view.run.status,
            failure = ?view.run.failure,
            move_count = view.game.move_count,
            "Run completed"
        );
        Ok(Some(view))
    }

    /// Marks an in-progress run as aborted.
    ///
    /// Waits for an in-flight step of the same run to finish first. Finished
    /// runs are returned unchanged; unknown runs yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if the store fails.
    #[instrument(skip(self))]
    pub async fn abort_run(&self, run_id: RunId) -> Result<Option<RunView>, OrchestratorError> {
        let _guard = self.locks.acquire(run_id).await;

        let Some(mut run) = self.store.get_run(run_id)? else {
            self.locks.release(run_id);
            return Ok(None);
        };
        if !run.finish(RunStatus::Aborted, None) {
            self.locks.release(run_id);
            return Ok(self.store.get_run_with_game(run_id)?);
        }
        self.store.set_run(&run)?;
        info!("Run aborted");
        self.conclude(run_id).map(Some)
    }

    /// The run with its game and trace.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if the store fails.
    #[instrument(skip(self))]
    pub fn get_run(&self, run_id: RunId) -> Result<Option<RunView>, OrchestratorError> {
        Ok(self.store.get_run_with_game(run_id)?)
    }

    /// Every run, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if the store fails.
    #[instrument(skip(self))]
    pub fn list_runs(&self) -> Result<Vec<RunView>, OrchestratorError> {
        Ok(self.store.get_all_runs_with_games()?)
    }

    /// Aggregate statistics.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] if the store fails.
    #[instrument(skip(self))]
    pub fn stats(&self) -> Result<RunStats, OrchestratorError> {
        Ok(self.store.get_stats()?)
    }

    /// Reloads the run after a change and tells observers about it.
    fn conclude(&self, run_id: RunId) -> Result<RunView, OrchestratorError> {
        let view = self
            .store
            .get_run_with_game(run_id)?
            .ok_or(OrchestratorError::Vanished(run_id))?;

        self.sink.publish(RunEvent::RunUpdated(view.clone()));
        if view.run.status.is_terminal() {
            self.locks.release(run_id);
            self.sink.publish(RunEvent::RunCompleted(view.clone()));
            self.publish_stats();
        }
        Ok(view)
    }

    fn publish_stats(&self) {
        match self.store.get_stats() {
            Ok(stats) => self.sink.publish(RunEvent::StatsUpdated(stats)),
            Err(e) => warn!(error = %e, "Skipping stats event"),
        }
    }
}

/// Checks a suggestion against the board and applies it when legal.
fn evaluate(board: &Board, suggestion: Option<Direction>) -> MoveOutcome {
    let Some(direction) = suggestion else {
        return MoveOutcome::Rejected(FailureKind::ParseError);
    };
    let legal = match board.legal_moves() {
        Ok(legal) => legal,
        Err(e) => {
            warn!(error = %e, "Current board is corrupt");
            return MoveOutcome::Rejected(FailureKind::InvalidBoard);
        }
    };
    if !legal.contains(&direction) {
        return MoveOutcome::Rejected(FailureKind::IllegalMove);
    }
    match board.apply_move(direction) {
        Ok(next) if next.is_valid() => MoveOutcome::Applied(next),
        Ok(_) => MoveOutcome::Rejected(FailureKind::InvalidBoard),
        Err(e) => {
            warn!(error = %e, "Legal move failed to apply");
            MoveOutcome::Rejected(FailureKind::InvalidBoard)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, GatewayReply};
    use crate::notify::NullSink;
    use crate::store::{MemoryStore, TraceRecorder};
    use uuid::Uuid;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingGateway {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelGateway for CountingGateway {
        async fn suggest_move(
            &self,
            _board: &Board,
            _model_id: &str,
            _moves_remaining: u32,
        ) -> Result<GatewayReply, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::new("unreachable in this test"))
        }
    }

    #[tokio::test]
    async fn test_spent_budget_fails_without_model_call() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(CountingGateway::default());
        let orchestrator =
            Orchestrator::with_seed(store.clone(), gateway.clone(), Arc::new(NullSink), 7);

        let config = RunConfig::new("m".to_string(), 3, 10, 5);
        let view = orchestrator.initialize_run(&config).expect("Initialize");

        let mut game = view.game.clone();
        game.move_count = view.run.max_moves;
        store.set_game(&game).expect("Store game");

        let after = orchestrator
            .step(view.run.id)
            .await
            .expect("Step")
            .expect("Run exists");

        assert_eq!(after.run.status, RunStatus::Failed);
        assert_eq!(after.run.failure, Some(FailureKind::BudgetExhausted));
        assert!(after.moves.is_empty());
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
        assert!(store.get_call_logs(view.run.id).expect("Logs").is_empty());
    }

    /// Always suggests the same direction.
    struct FixedGateway(Direction);

    #[async_trait]
    impl ModelGateway for FixedGateway {
        async fn suggest_move(
            &self,
            _board: &Board,
            _model_id: &str,
            _moves_remaining: u32,
        ) -> Result<GatewayReply, GatewayError> {
            Ok(GatewayReply {
                request_id: Uuid::new_v4(),
                parsed_move: Some(self.0),
                content: format!(r#"{{"move": "{}"}}"#, self.0),
                raw_response: serde_json::Value::Null,
                latency_ms: 3,
                token_usage: None,
            })
        }
    }

    #[tokio::test]
    async fn test_lock_table_forgets_idle_runs() {
        let orchestrator = Orchestrator::with_seed(
            Arc::new(MemoryStore::new()),
            Arc::new(CountingGateway::default()),
            Arc::new(NullSink),
            7,
        );

        for _ in 0..100 {
            assert!(orchestrator.step(Uuid::new_v4()).await.expect("Step").is_none());
            assert!(orchestrator.abort_run(Uuid::new_v4()).await.expect("Abort").is_none());
        }
        assert!(orchestrator.locks.is_empty());

        let view = orchestrator
            .initialize_run(&RunConfig::new("m".to_string(), 3, 10, 5))
            .expect("Initialize");
        let run_id = view.run.id;
        orchestrator.abort_run(run_id).await.expect("Abort");
        for _ in 0..5 {
            let after = orchestrator
                .step(run_id)
                .await
                .expect("Step")
                .expect("Run exists");
            assert_eq!(after.run.status, RunStatus::Aborted);
        }
        orchestrator.abort_run(run_id).await.expect("Abort");
        assert!(orchestrator.locks.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_board_fails_run_with_invalid_board() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = Orchestrator::with_seed(
            store.clone(),
            Arc::new(FixedGateway(Direction::Up)),
            Arc::new(NullSink),
            7,
        );

        let view = orchestrator
            .initialize_run(&RunConfig::new("m".to_string(), 2, 10, 1))
            .expect("Initialize");
        let corrupt = Board::from_rows(vec![vec![Some(1), None], vec![None, Some(2)]])
            .expect("Square grid");
        let mut game = view.game.clone();
        game.current_board = corrupt.clone();
        store.set_game(&game).expect("Store game");

        let after = orchestrator
            .step(view.run.id)
            .await
            .expect("Step")
            .expect("Run exists");

        assert_eq!(after.run.status, RunStatus::Failed);
        assert_eq!(after.run.failure, Some(FailureKind::InvalidBoard));
        assert_eq!(after.game.status, GameStatus::Error);
        assert_eq!(after.game.move_count, 0);
        assert_eq!(after.game.current_board, corrupt);

        assert_eq!(after.moves.len(), 1);
        let record = &after.moves[0];
        assert_eq!(record.error_kind, Some(FailureKind::InvalidBoard));
        assert_eq!(record.suggested_move, Some(Direction::Up));
        assert!(record.is_parsed);
        assert!(!record.is_legal);
        assert_eq!(record.post_board, None);
        assert_eq!(record.pre_board, corrupt);
        assert_eq!(store.get_call_logs(view.run.id).expect("Logs").len(), 1);
        assert!(orchestrator.locks.is_empty());
    }

    #[test]
    fn test_evaluate_outcomes() {
        let board = Board::solved(2);
        assert!(matches!(
            evaluate(&board, None),
            MoveOutcome::Rejected(FailureKind::ParseError)
        ));
        assert!(matches!(
            evaluate(&board, Some(Direction::Down)),
            MoveOutcome::Rejected(FailureKind::IllegalMove)
        ));
        assert!(matches!(
            evaluate(&board, Some(Direction::Up)),
            MoveOutcome::Applied(_)
        ));
    }
}
