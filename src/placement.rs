//! Fleet placement validation: bounds, overlap and the no-touching rule,
//! manual placement and removal, and randomized auto-placement.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
use rand::Rng;

use crate::board::{Board, CellState, Coord};
use crate::common::GameError;
use crate::config::{required_count, FLEET_SIZES, MAX_SHIP_SIZE, NUM_SHIPS};
use crate::fleet::Fleet;
use crate::ship::{Orientation, Ship, ShipPlacement};

/// Returns `true` iff a ship of `size` starting at `origin` fits on the board,
/// covers no `Ship` cell and touches none, diagonals included. Always reads
/// the board as it is now.
pub fn can_place(board: &Board, origin: Coord, size: usize, orientation: Orientation) -> bool {
    if size == 0 || size > MAX_SHIP_SIZE {
        return false;
    }
    let cells = match ShipPlacement::new(origin, size, orientation).cells() {
        Ok(cells) => cells,
        Err(_) => return false,
    };
    cells.iter().all(|&at| {
        board.get(at) != CellState::Ship
            && at.neighbors().all(|n| board.get(n) != CellState::Ship)
    })
}

/// Place a ship, marking its cells and appending it to the fleet.
pub fn place<'f>(
    board: &mut Board,
    fleet: &'f mut Fleet,
    placement: ShipPlacement,
) -> Result<&'f Ship, GameError> {
    if fleet.is_locked() {
        return Err(GameError::FleetLocked);
    }
    if fleet.count_of(placement.size) >= required_count(placement.size) {
        return Err(GameError::InvalidPlacement);
    }
    if !can_place(board, placement.origin, placement.size, placement.orientation) {
        return Err(GameError::InvalidPlacement);
    }
    let ship = Ship::new(placement)?;
    for &at in ship.cells() {
        board.set(at, CellState::Ship);
    }
    fleet.push(ship);
    let placed = &fleet.ships()[fleet.len() - 1];
    Ok(placed)
}

/// Remove the ship covering `at`, returning its cells to `Empty`.
pub fn remove_placement(board: &mut Board, fleet: &mut Fleet, at: Coord) -> Result<Ship, GameError> {
    if fleet.is_locked() {
        return Err(GameError::FleetLocked);
    }
    let index = fleet.ship_at(at).ok_or(GameError::InvalidPlacement)?;
    let ship = fleet.remove(index);
    for &cell in ship.cells() {
        board.set(cell, CellState::Empty);
    }
    Ok(ship)
}

/// Wipe every placement of a fleet that is not yet ready.
pub fn clear_placements(board: &mut Board, fleet: &mut Fleet) -> Result<(), GameError> {
    if fleet.is_locked() {
        return Err(GameError::FleetLocked);
    }
    *board = Board::new();
    fleet.clear();
    Ok(())
}

/// `true` iff the fleet holds exactly the fixed composition.
pub fn is_complete(fleet: &Fleet) -> bool {
    fleet.len() == NUM_SHIPS
        && (1..=MAX_SHIP_SIZE).all(|size| fleet.count_of(size) == required_count(size))
}

/// Every legal placement of a ship of `size` on the board as it is now.
pub fn legal_placements(board: &Board, size: usize) -> Vec<ShipPlacement> {
    let mut out = Vec::new();
    for origin in Coord::all() {
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            if can_place(board, origin, size, orientation) {
                out.push(ShipPlacement::new(origin, size, orientation));
            }
        }
    }
    out
}

/// Lay out a full fleet at random, largest ships first. Existing placements
/// are discarded. Each ship picks uniformly among all legal positions; if one
/// has none left the layout starts over.
pub fn auto_place<R: Rng + ?Sized>(
    board: &mut Board,
    fleet: &mut Fleet,
    rng: &mut R,
) -> Result<(), GameError> {
    clear_placements(board, fleet)?;
    'layout: loop {
        for &size in FLEET_SIZES.iter() {
            let options = legal_placements(board, size);
            if options.is_empty() {
                *board = Board::new();
                fleet.clear();
                continue 'layout;
            }
            let pick = options[rng.random_range(0..options.len())];
            place(board, fleet, pick)?;
        }
        return Ok(());
    }
}

/// Rebuild a submitted layout on a scratch board. Nothing is returned unless
/// every placement is legal and the result is the complete fleet.
pub fn validate_layout(placements: &[ShipPlacement]) -> Result<(Board, Fleet), GameError> {
    let mut board = Board::new();
    let mut fleet = Fleet::new();
    for &placement in placements {
        place(&mut board, &mut fleet, placement)?;
    }
    if !is_complete(&fleet) {
        return Err(GameError::IncompleteFleet);
    }
    Ok((board, fleet))
}

/// A random complete layout as a list of placements, ready to submit.
pub fn random_layout<R: Rng + ?Sized>(rng: &mut R) -> Result<Vec<ShipPlacement>, GameError> {
    let mut board = Board::new();
    let mut fleet = Fleet::new();
    auto_place(&mut board, &mut fleet, rng)?;
    Ok(fleet.ships().iter().map(|ship| ship.placement()).collect())
}
