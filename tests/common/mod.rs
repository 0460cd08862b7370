#![allow(dead_code)]

use seabattle::{Coord, Orientation, ShipPlacement};

pub fn at(row: usize, col: usize) -> Coord {
    Coord::new(row, col).unwrap()
}

fn ship(row: usize, col: usize, size: usize, orientation: Orientation) -> ShipPlacement {
    ShipPlacement::new(at(row, col), size, orientation)
}

/// A legal complete fleet with a lone 1-cell ship at (3,3).
pub fn standard_layout() -> Vec<ShipPlacement> {
    use Orientation::Horizontal as H;
    vec![
        ship(0, 0, 4, H),
        ship(0, 5, 3, H),
        ship(5, 0, 3, H),
        ship(5, 4, 2, H),
        ship(5, 7, 2, H),
        ship(7, 0, 2, H),
        ship(3, 3, 1, H),
        ship(7, 3, 1, H),
        ship(7, 5, 1, H),
        ship(9, 9, 1, H),
    ]
}

/// Every cell covered by `layout`.
pub fn ship_cells(layout: &[ShipPlacement]) -> Vec<Coord> {
    layout.iter().flat_map(|p| p.cells().unwrap()).collect()
}
