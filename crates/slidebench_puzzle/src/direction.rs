//! Move directions, expressed as motion of the blank.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Direction the blank travels on a move.
///
/// `Up` exchanges the blank with the tile above it, so that tile slides
/// down into the blank's old cell. Every direction is relative to the blank,
/// never to the tile.
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
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Blank moves one row up.
    Up,
    /// Blank moves one row down.
    Down,
    /// Blank moves one column left.
    Left,
    /// Blank moves one column right.
    Right,
}

impl Direction {
    /// All four directions, in the order legal moves are reported.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Returns the direction that undoes this one.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Row and column displacement of the blank.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// Parses the exact lowercase name (`up`, `down`, `left`, `right`).
    ///
    /// Anything else, including surrounding whitespace or other casing,
    /// returns `None`.
    #[instrument]
    pub fn parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_involution() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_ne!(direction.opposite(), direction);
        }
    }

    #[test]
    fn test_parse_is_strict() {
        assert_eq!(Direction::parse("up"), Some(Direction::Up));
        assert_eq!(Direction::parse("right"), Some(Direction::Right));
        assert_eq!(Direction::parse("Up"), None);
        assert_eq!(Direction::parse(" left"), None);
        assert_eq!(Direction::parse("north"), None);
    }

    #[test]
    fn test_display_matches_wire_name() {
        assert_eq!(Direction::Down.to_string(), "down");
        assert_eq!(Direction::Left.as_ref(), "left");
    }
}
