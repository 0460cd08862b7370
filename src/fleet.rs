//! A player's set of ships and the views derived from it.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::board::Coord;
use crate::config::MAX_SHIP_SIZE;
use crate::ship::Ship;

/// Ships owned by one seat. Shape is frozen once the owner signals ready;
/// only hit counts change afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Fleet {
    ships: Vec<Ship>,
    locked: bool,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn lock(&mut self) {
        self.locked = true;
    }

    pub(crate) fn push(&mut self, ship: Ship) {
        self.ships.push(ship);
    }

    pub(crate) fn remove(&mut self, index: usize) -> Ship {
        self.ships.remove(index)
    }

    pub(crate) fn clear(&mut self) {
        self.ships.clear();
    }

    pub(crate) fn ship_mut(&mut self, index: usize) -> Option<&mut Ship> {
        self.ships.get_mut(index)
    }

    /// Index of the ship covering `at`, if any.
    pub fn ship_at(&self, at: Coord) -> Option<usize> {
        self.ships.iter().position(|s| s.contains(at))
    }

    /// Number of placed ships of length `size`.
    pub fn count_of(&self, size: usize) -> usize {
        self.ships.iter().filter(|s| s.size() == size).count()
    }

    /// Ships not yet sunk, grouped by length: index `i` holds the count for
    /// length `i + 1`.
    pub fn remaining_by_size(&self) -> [usize; MAX_SHIP_SIZE] {
        let mut remaining = [0usize; MAX_SHIP_SIZE];
        for ship in self.ships.iter().filter(|s| !s.is_sunk()) {
            remaining[ship.size() - 1] += 1;
        }
        remaining
    }

    /// Lengths of the ships still afloat, largest first.
    pub fn afloat_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self
            .ships
            .iter()
            .filter(|s| !s.is_sunk())
            .map(|s| s.size())
            .collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes
    }

    /// `true` when the fleet has ships and every one of them is sunk.
    pub fn all_sunk(&self) -> bool {
        !self.ships.is_empty() && self.ships.iter().all(|s| s.is_sunk())
    }
}
