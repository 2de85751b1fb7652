//! The `n x n` sliding-tile board.

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::{BoardError, Direction};

/// Content of one cell: `Some(tile)` for a numbered tile, `None` for the blank.
pub type Tile = Option<u32>;

/// Row and column of a cell, zero-based from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("({row}, {col})")]
pub struct Coord {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
}

impl Coord {
    /// Creates a coordinate.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Square puzzle grid stored in row-major order.
///
/// Serializes as nested rows of `number | null`, the blank being `null`.
/// Deserialization enforces the full board invariant, while
/// [`Board::from_rows`] only checks the shape so that damaged boards can be
/// represented and detected with [`Board::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<Tile>>", try_from = "Vec<Vec<Tile>>")]
pub struct Board {
    size: usize,
    cells: Vec<Tile>,
}

impl Board {
    /// Returns the goal board: `1..n²-1` in row-major order, blank last.
    ///
    /// Sizes below 1 are treated as 1.
    #[instrument]
    pub fn solved(size: usize) -> Self {
        let size = size.max(1);
        let last = size * size - 1;
        let cells = (0..size * size)
            .map(|i| if i == last { None } else { Some(i as u32 + 1) })
            .collect();
        Self { size, cells }
    }

    /// Builds a board from explicit rows, checking only that the grid is square.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidShape`] for an empty grid or ragged rows.
    #[instrument(skip(rows), fields(rows = rows.len()))]
    pub fn from_rows(rows: Vec<Vec<Tile>>) -> Result<Self, BoardError> {
        let size = rows.len();
        if size == 0 {
            return Err(BoardError::InvalidShape("board has no rows".to_string()));
        }
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != size) {
            return Err(BoardError::InvalidShape(format!(
                "row {} has {} cells, expected {}",
                index,
                row.len(),
                size
            )));
        }
        let cells = rows.into_iter().flatten().collect();
        Ok(Self { size, cells })
    }

    /// Edge length `n`.
    pub fn size(&self) -> usize {
        self.size
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Tile] {
        &self.cells
    }

    /// Returns the cell at `coord`, or `None` when it lies outside the grid.
    pub fn get(&self, coord: Coord) -> Option<Tile> {
        if coord.row >= self.size || coord.col >= self.size {
            return None;
        }
        self.cells.get(coord.row * self.size + coord.col).copied()
    }

    /// Copies the board into nested rows.
    pub fn rows(&self) -> Vec<Vec<Tile>> {
        self.cells.chunks(self.size).map(<[Tile]>::to_vec).collect()
    }

    /// Locates the blank.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::CorruptBoard`] unless exactly one blank exists.
    #[instrument(skip(self))]
    pub fn find_blank(&self) -> Result<Coord, BoardError> {
        let mut blanks = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| index);

        match (blanks.next(), blanks.next()) {
            (Some(index), None) => Ok(Coord::new(index / self.size, index % self.size)),
            (None, _) => Err(BoardError::CorruptBoard("no blank cell".to_string())),
            (Some(_), Some(_)) => Err(BoardError::CorruptBoard(format!(
                "{} blank cells",
                self.cells.iter().filter(|cell| cell.is_none()).count()
            ))),
        }
    }

    /// Cell reached by moving from `coord` in `direction`, if it is on the board.
    fn neighbor(&self, coord: Coord, direction: Direction) -> Option<Coord> {
        let (dr, dc) = direction.delta();
        let row = coord.row.checked_add_signed(dr)?;
        let col = coord.col.checked_add_signed(dc)?;
        (row < self.size && col < self.size).then_some(Coord::new(row, col))
    }

    /// Directions the blank can move without leaving the grid.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::CorruptBoard`] if the blank cannot be located.
    #[instrument(skip(self))]
    pub fn legal_moves(&self) -> Result<Vec<Direction>, BoardError> {
        let blank = self.find_blank()?;
        Ok(Direction::ALL
            .into_iter()
            .filter(|direction| self.neighbor(blank, *direction).is_some())
            .collect())
    }

    /// Returns a new board with the blank swapped with its neighbor in `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::IllegalMove`] if the blank would leave the grid,
    /// or [`BoardError::CorruptBoard`] if the blank cannot be located.
    #[instrument(skip(self), fields(size = self.size))]
    pub fn apply_move(&self, direction: Direction) -> Result<Self, BoardError> {
        let blank = self.find_blank()?;
        let target = self
            .neighbor(blank, direction)
            .ok_or(BoardError::IllegalMove {
                direction,
                blank,
                size: self.size,
            })?;

        let mut next = self.clone();
        next.cells
            .swap(blank.row * self.size + blank.col, target.row * self.size + target.col);
        trace!(%blank, %target, "Blank moved");
        Ok(next)
    }

    /// Checks the structural invariant: one blank, each of `1..n²-1` exactly once.
    #[instrument(skip(self))]
    pub fn is_valid(&self) -> bool {
        if self.size == 0 || self.cells.len() != self.size * self.size {
            return false;
        }
        let mut seen = vec![false; self.cells.len()];
        let mut blanks = 0;
        for cell in &self.cells {
            match cell {
                None => blanks += 1,
                Some(tile) => {
                    let index = *tile as usize;
                    if index == 0 || index >= seen.len() || seen[index] {
                        return false;
                    }
                    seen[index] = true;
                }
            }
        }
        blanks == 1
    }

    /// Cell-by-cell comparison against [`Board::solved`].
    #[instrument(skip(self))]
    pub fn is_solved(&self) -> bool {
        *self == Self::solved(self.size)
    }

    /// Formats the board as a grid of right-aligned tiles, blank shown as `_`.
    pub fn render(&self) -> String {
        let width = (self.size * self.size).to_string().len();
        self.cells
            .chunks(self.size)
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some(tile) => format!("{:>width$}", tile, width = width),
                        None => format!("{:>width$}", "_", width = width),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Board> for Vec<Vec<Tile>> {
    fn from(board: Board) -> Self {
        board.rows()
    }
}

impl TryFrom<Vec<Vec<Tile>>> for Board {
    type Error = BoardError;

    fn try_from(rows: Vec<Vec<Tile>>) -> Result<Self, Self::Error> {
        let board = Self::from_rows(rows)?;
        if !board.is_valid() {
            return Err(BoardError::CorruptBoard(
                "tiles are not a permutation of 1..n²-1 plus one blank".to_string(),
            ));
        }
        Ok(board)
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_stays_in_bounds() {
        let board = Board::solved(3);
        assert_eq!(board.neighbor(Coord::new(0, 0), Direction::Up), None);
        assert_eq!(board.neighbor(Coord::new(0, 0), Direction::Left), None);
        assert_eq!(
            board.neighbor(Coord::new(0, 0), Direction::Right),
            Some(Coord::new(0, 1))
        );
        assert_eq!(board.neighbor(Coord::new(2, 2), Direction::Down), None);
    }

    #[test]
    fn test_render_pads_tiles() {
        let board = Board::solved(4);
        let rendered = board.render();
        assert!(rendered.starts_with(" 1  2  3  4"));
        assert!(rendered.ends_with("13 14 15  _"));
    }
}
