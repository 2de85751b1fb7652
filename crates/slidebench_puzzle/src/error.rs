//! Board model errors.

use crate::{Coord, Direction};

/// Error raised by a single board operation.
///
/// Board errors fail only the operation that produced them; the board the
/// operation was called on is never modified.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum BoardError {
    /// The blank cannot move in the requested direction without leaving the grid.
    #[display("Illegal move {direction}: blank at {blank} is on the edge of a {size}x{size} board")]
    IllegalMove {
        /// Requested direction.
        direction: Direction,
        /// Blank position at the time of the request.
        blank: Coord,
        /// Board edge length.
        size: usize,
    },

    /// The board violates the one-blank, one-of-each-tile invariant.
    #[display("Corrupt board: {}", _0)]
    CorruptBoard(String),

    /// The grid is not an `n x n` square with `n >= 1`.
    #[display("Invalid board shape: {}", _0)]
    InvalidShape(String),
}

impl std::error::Error for BoardError {}
