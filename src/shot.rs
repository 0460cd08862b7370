//! Shot resolution: hit/miss bookkeeping on both boards and sinking detection.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::board::{Board, CellState, Coord};
use crate::common::GameError;
use crate::fleet::Fleet;

/// Outcome of one accepted shot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ShotReport {
    pub at: Coord,
    pub hit: bool,
    /// Every cell of the ship this shot finished off.
    pub sunk: Option<Vec<Coord>>,
    /// The target fleet has no ship left afloat.
    pub fleet_destroyed: bool,
}

impl ShotReport {
    /// A hit grants another shot unless it ended the game.
    pub fn retains_turn(&self) -> bool {
        self.hit && !self.fleet_destroyed
    }
}

/// Fire at `at` on the target's board, mirroring the result onto the
/// shooter's overlay. Rejected shots leave all three arguments untouched.
pub fn resolve_shot(
    target_board: &mut Board,
    target_fleet: &mut Fleet,
    overlay: &mut Board,
    at: Coord,
) -> Result<ShotReport, GameError> {
    let at = at.checked()?;
    if target_board.get(at).is_shot() || overlay.get(at).is_shot() {
        return Err(GameError::AlreadyShot);
    }

    if target_board.get(at) != CellState::Ship {
        target_board.set(at, CellState::Miss);
        overlay.set(at, CellState::Miss);
        return Ok(ShotReport {
            at,
            hit: false,
            sunk: None,
            fleet_destroyed: false,
        });
    }

    // a Ship cell with no owning ship means the board and fleet diverged
    let index = target_fleet.ship_at(at).ok_or(GameError::InvalidPlacement)?;
    target_board.set(at, CellState::Hit);
    overlay.set(at, CellState::Hit);

    let mut sunk = None;
    if let Some(ship) = target_fleet.ship_mut(index) {
        ship.register_hit();
        if ship.is_sunk() {
            for &cell in ship.cells() {
                target_board.set(cell, CellState::Sunk);
                overlay.set(cell, CellState::Sunk);
            }
            sunk = Some(ship.cells().to_vec());
        }
    }

    Ok(ShotReport {
        at,
        hit: true,
        sunk,
        fleet_destroyed: target_fleet.all_sunk(),
    })
}
