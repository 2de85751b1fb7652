//! Random-walk scrambling from the solved board.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument, warn};

use crate::{Board, Direction};

/// Produces scrambled boards by random walks that never immediately undo a move.
///
/// Walks only forbid the direct inverse of the previous move, so a walk of
/// `depth` moves can still end closer than `depth` moves to the goal.
#[derive(Debug, Clone)]
pub struct Scrambler {
    rng: ChaCha8Rng,
}

impl Scrambler {
    /// Creates a scrambler whose walks are reproducible for a given seed.
    #[instrument]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a scrambler seeded from operating-system entropy.
    #[instrument]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Walks `depth` random legal moves away from the solved `size x size` board.
    ///
    /// The walk stops early only when no candidate move exists, which happens
    /// on a `1 x 1` board.
    #[instrument(skip(self))]
    pub fn scramble(&mut self, size: usize, depth: usize) -> Board {
        let mut board = Board::solved(size);
        let mut last: Option<Direction> = None;

        for step in 0..depth {
            let mut candidates = match board.legal_moves() {
                Ok(moves) => moves,
                Err(e) => {
                    warn!(step, error = %e, "Scramble walk hit an unreadable board");
                    break;
                }
            };
            if let Some(previous) = last {
                candidates.retain(|direction| *direction != previous.opposite());
            }

            let Some(&direction) = candidates.choose(&mut self.rng) else {
                debug!(step, "No candidate moves left, ending walk");
                break;
            };

            match board.apply_move(direction) {
                Ok(next) => board = next,
                Err(e) => {
                    warn!(step, error = %e, "Scramble move rejected");
                    break;
                }
            }
            last = Some(direction);
        }

        debug!(size, depth, solved = board.is_solved(), "Board scrambled");
        board
    }
}

impl Default for Scrambler {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Scrambles with a fresh entropy-seeded [`Scrambler`].
#[instrument]
pub fn scramble(size: usize, depth: usize) -> Board {
    Scrambler::from_entropy().scramble(size, depth)
}
