//! Sliding-tile puzzle engine.
//!
//! Pure functions over an `n x n` board holding the tiles `1..n²-1` and a
//! single blank. Nothing in this crate performs I/O.
//!
//! # Example
//!
//! ```
//! use slidebench_puzzle::{Board, Direction};
//!
//! let solved = Board::solved(3);
//! assert!(solved.is_solved());
//!
//! // The blank starts in the bottom-right corner, so it can only go up or left.
//! let moved = solved.apply_move(Direction::Up).unwrap();
//! assert!(!moved.is_solved());
//! assert_eq!(moved.apply_move(Direction::Down).unwrap(), solved);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod direction;
mod error;
mod scramble;

pub use board::{Board, Coord, Tile};
pub use direction::Direction;
pub use error::BoardError;
pub use scramble::{Scrambler, scramble};
