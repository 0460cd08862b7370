//! Fixed game constants: board geometry and fleet composition.

pub const BOARD_SIZE: u8 = 10;

/// Largest ship length in the fleet.
pub const MAX_SHIP_SIZE: usize = 4;

pub const NUM_SHIPS: usize = 10;

/// Ship lengths of one fleet, largest first.
pub const FLEET_SIZES: [usize; NUM_SHIPS] = [4, 3, 3, 2, 2, 2, 1, 1, 1, 1];

/// Total number of ship segments in a full fleet.
pub const TOTAL_SHIP_CELLS: usize = 4 + 3 + 3 + 2 + 2 + 2 + 1 + 1 + 1 + 1;

/// Number of ships of length `size` a complete fleet contains. Zero for any
/// length outside `1..=MAX_SHIP_SIZE`.
pub const fn required_count(size: usize) -> usize {
    match size {
        4 => 1,
        3 => 2,
        2 => 3,
        1 => 4,
        _ => 0,
    }
}
