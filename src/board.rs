//! Fixed 10×10 grid of enumerated cell states. Pure storage and lookup.

use crate::common::GameError;
use crate::config::BOARD_SIZE;
use core::fmt;
use core::str::FromStr;

const N: usize = BOARD_SIZE as usize;

/// State of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum CellState {
    /// Water, or unknown on an overlay.
    #[default]
    Empty,
    /// Intact ship segment. Never present on an overlay.
    Ship,
    /// Ship segment that was hit, ship still afloat.
    Hit,
    /// Segment of a ship whose every cell has been hit.
    Sunk,
    /// Shot that landed on water.
    Miss,
}

impl CellState {
    /// `true` once a shot has landed on the cell.
    pub fn is_shot(self) -> bool {
        matches!(self, CellState::Hit | CellState::Sunk | CellState::Miss)
    }
}

/// A board coordinate. [`Coord::new`] and [`Coord::checked`] enforce the
/// bounds; anything decoded from the wire goes through `checked` before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Coord {
    pub row: u8,
    pub col: u8,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Result<Self, GameError> {
        if row >= N || col >= N {
            return Err(GameError::OutOfBounds { row, col });
        }
        Ok(Coord {
            row: row as u8,
            col: col as u8,
        })
    }

    /// Re-check a coordinate that was built field by field, e.g. one that
    /// arrived off the wire.
    pub fn checked(self) -> Result<Coord, GameError> {
        Coord::new(self.row(), self.col())
    }

    pub fn row(self) -> usize {
        self.row as usize
    }

    pub fn col(self) -> usize {
        self.col as usize
    }

    /// In-bounds cells of the 8-connected neighbourhood, excluding `self`.
    pub fn neighbors(self) -> impl Iterator<Item = Coord> {
        let (r, c) = (self.row as isize, self.col as isize);
        (-1isize..=1)
            .flat_map(move |dr| (-1isize..=1).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .filter_map(move |(dr, dc)| {
                let (nr, nc) = (r + dr, c + dc);
                if nr < 0 || nc < 0 {
                    return None;
                }
                Coord::new(nr as usize, nc as usize).ok()
            })
    }

    /// Orthogonal in-bounds neighbours only.
    pub fn orthogonal(self) -> impl Iterator<Item = Coord> {
        self.neighbors()
            .filter(move |n| n.row == self.row || n.col == self.col)
    }

    /// Every coordinate of the board in row-major order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..N).flat_map(|r| {
            (0..N).map(move |c| Coord {
                row: r as u8,
                col: c as u8,
            })
        })
    }
}

/// Formats as column letter plus 1-based row, e.g. `B5`.
impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.col) as char, self.row + 1)
    }
}

/// Parses `A1`-style input: a column letter `A`-`J` (either case) followed
/// by a row number `1`-`10`.
impl FromStr for Coord {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const BAD: &str = "coordinates look like B5: a letter A-J then a row 1-10";
        let s = s.trim();
        let mut chars = s.chars();
        let col_ch = chars.next().ok_or(BAD)?.to_ascii_uppercase();
        if !col_ch.is_ascii_uppercase() {
            return Err(BAD);
        }
        let col = (col_ch as u8 - b'A') as usize;
        let row: usize = chars.as_str().parse().map_err(|_| BAD)?;
        if row == 0 {
            return Err(BAD);
        }
        Coord::new(row - 1, col).map_err(|_| BAD)
    }
}

/// One player's grid: either the owner's own board or the overlay kept of the
/// opponent's board.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Board {
    cells: [[CellState; N]; N],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create an all-empty board.
    pub fn new() -> Self {
        Board {
            cells: [[CellState::Empty; N]; N],
        }
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Result<CellState, GameError> {
        let at = Coord::new(row, col)?;
        Ok(self.get(at))
    }

    pub fn set_cell(&mut self, row: usize, col: usize, state: CellState) -> Result<(), GameError> {
        let at = Coord::new(row, col)?;
        self.set(at, state);
        Ok(())
    }

    /// Infallible lookup for an already validated coordinate.
    pub fn get(&self, at: Coord) -> CellState {
        self.cells[at.row()][at.col()]
    }

    pub fn set(&mut self, at: Coord, state: CellState) {
        self.cells[at.row()][at.col()] = state;
    }

    /// Number of cells currently in `state`.
    pub fn count(&self, state: CellState) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&c| c == state)
            .count()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellState; N]> {
        self.cells.iter()
    }

    /// The same board with intact ship segments hidden, as an opponent sees it.
    pub fn overlay(&self) -> Board {
        let mut out = *self;
        for row in out.cells.iter_mut() {
            for cell in row.iter_mut() {
                if *cell == CellState::Ship {
                    *cell = CellState::Empty;
                }
            }
        }
        out
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.iter() {
            for cell in row.iter() {
                let ch = match cell {
                    CellState::Empty => '.',
                    CellState::Ship => 'S',
                    CellState::Hit => 'X',
                    CellState::Sunk => '#',
                    CellState::Miss => 'o',
                };
                write!(f, "{}", ch)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
