//! The puzzle instance attached to a run.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use slidebench_puzzle::Board;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Unique identifier for a game.
pub type GameId = Uuid;

/// Lifecycle of a game.
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
pub enum GameStatus {
    /// Moves can still be applied.
    InProgress,
    /// The current board equals the goal board.
    Solved,
    /// A move produced a board that broke the invariant.
    Error,
}

/// A scrambled puzzle and the progress made on it.
///
/// Only the orchestrator mutates a game, and never after it leaves
/// [`GameStatus::InProgress`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    #[serde(rename = "gameId")]
    pub(crate) id: GameId,
    pub(crate) size: usize,
    pub(crate) initial_board: Board,
    pub(crate) current_board: Board,
    pub(crate) status: GameStatus,
    pub(crate) move_count: u32,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Game {
    /// Starts a game from a scrambled board.
    #[instrument(skip(board), fields(size = board.size()))]
    pub fn new(board: Board) -> Self {
        let now = Utc::now();
        let game = Self {
            id: Uuid::new_v4(),
            size: board.size(),
            initial_board: board.clone(),
            current_board: board,
            status: GameStatus::InProgress,
            move_count: 0,
            created_at: now,
            updated_at: now,
        };
        debug!(game_id = %game.id, "Game created");
        game
    }

    /// Returns `true` while moves can still be applied.
    pub fn is_in_progress(&self) -> bool {
        self.status == GameStatus::InProgress
    }

    /// Replaces the current board after an accepted move.
    ///
    /// Increments the move count and marks the game solved when the new
    /// board is the goal. Ignored once the game has finished.
    #[instrument(skip(self, board), fields(game_id = %self.id, move_count = self.move_count))]
    pub(crate) fn commit(&mut self, board: Board) {
        if !self.is_in_progress() {
            warn!(status = %self.status, "Ignoring move on finished game");
            return;
        }
        self.move_count += 1;
        if board.is_solved() {
            self.status = GameStatus::Solved;
        }
        self.current_board = board;
        self.updated_at = Utc::now();
    }

    /// Marks the game as broken by an invariant violation.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub(crate) fn mark_error(&mut self) {
        if self.is_in_progress() {
            self.status = GameStatus::Error;
            self.updated_at = Utc::now();
        }
    }
}
