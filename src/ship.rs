//! Ship records: occupied cells, orientation and accumulated hits.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
use core::fmt;

use crate::board::Coord;
use crate::common::GameError;
use crate::config::MAX_SHIP_SIZE;

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Where and how a ship is laid down, without any hit state. This is what a
/// client submits when it signals ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ShipPlacement {
    pub origin: Coord,
    pub size: usize,
    pub orientation: Orientation,
}

impl ShipPlacement {
    pub fn new(origin: Coord, size: usize, orientation: Orientation) -> Self {
        Self {
            origin,
            size,
            orientation,
        }
    }

    /// Cells covered by this placement, starting at the origin. Fails with
    /// `OutOfBounds` on the first cell that leaves the board.
    pub fn cells(&self) -> Result<Vec<Coord>, GameError> {
        (0..self.size)
            .map(|i| match self.orientation {
                Orientation::Horizontal => Coord::new(self.origin.row(), self.origin.col() + i),
                Orientation::Vertical => Coord::new(self.origin.row() + i, self.origin.col()),
            })
            .collect()
    }
}

/// A ship placed on the board.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Ship {
    size: usize,
    orientation: Orientation,
    cells: Vec<Coord>,
    hits: usize,
}

impl Ship {
    /// Build a ship from a placement. Only bounds and size are checked here;
    /// overlap and adjacency are the placement validator's job.
    pub fn new(placement: ShipPlacement) -> Result<Self, GameError> {
        if placement.size == 0 || placement.size > MAX_SHIP_SIZE {
            return Err(GameError::InvalidPlacement);
        }
        let cells = placement.cells()?;
        Ok(Ship {
            size: placement.size,
            orientation: placement.orientation,
            cells,
            hits: 0,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Occupied cells in order from the origin.
    pub fn cells(&self) -> &[Coord] {
        &self.cells
    }

    pub fn origin(&self) -> Coord {
        self.cells[0]
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn contains(&self, at: Coord) -> bool {
        self.cells.contains(&at)
    }

    /// Record one hit. Callers guarantee each cell is hit at most once.
    pub(crate) fn register_hit(&mut self) {
        if self.hits < self.size {
            self.hits += 1;
        }
    }

    /// A ship is sunk iff every one of its cells has been hit.
    pub fn is_sunk(&self) -> bool {
        self.hits == self.size
    }

    pub fn placement(&self) -> ShipPlacement {
        ShipPlacement::new(self.origin(), self.size, self.orientation)
    }
}

impl fmt::Debug for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ size: {}, origin: {}, orientation: {:?}, hits: {} }}",
            self.size,
            self.origin(),
            self.orientation,
            self.hits,
        )
    }
}
