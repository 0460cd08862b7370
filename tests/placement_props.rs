use proptest::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use seabattle::placement::is_complete;
use seabattle::{
    auto_place, can_place, place, Board, CellState, Coord, Fleet, Orientation, ShipPlacement,
    BOARD_SIZE, MAX_SHIP_SIZE, TOTAL_SHIP_CELLS,
};

/// No two distinct ships touch, diagonals included.
fn no_contact(fleet: &Fleet) -> bool {
    let ships = fleet.ships();
    ships.iter().enumerate().all(|(i, a)| {
        ships.iter().enumerate().filter(|&(j, _)| j != i).all(|(_, b)| {
            a.cells()
                .iter()
                .all(|&cell| !b.contains(cell) && cell.neighbors().all(|n| !b.contains(n)))
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn auto_place_is_always_legal(seed in any::<u64>()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut board = Board::new();
        let mut fleet = Fleet::new();
        auto_place(&mut board, &mut fleet, &mut rng).unwrap();
        prop_assert!(is_complete(&fleet));
        prop_assert_eq!(board.count(CellState::Ship), TOTAL_SHIP_CELLS);
        prop_assert!(no_contact(&fleet));
    }

    #[test]
    fn random_placement_attempts_never_break_the_rules(seed in any::<u64>(), attempts in 1usize..60) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut board = Board::new();
        let mut fleet = Fleet::new();
        for _ in 0..attempts {
            let origin = Coord::new(
                rng.random_range(0..BOARD_SIZE as usize),
                rng.random_range(0..BOARD_SIZE as usize),
            ).unwrap();
            let size = rng.random_range(1..=MAX_SHIP_SIZE);
            let orientation = if rng.random_bool(0.5) {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let allowed = can_place(&board, origin, size, orientation);
            let before = board;
            let result = place(&mut board, &mut fleet, ShipPlacement::new(origin, size, orientation));
            if result.is_err() {
                prop_assert_eq!(board, before);
            } else {
                prop_assert!(allowed);
            }
        }
        prop_assert!(no_contact(&fleet));
        let covered: usize = fleet.ships().iter().map(|s| s.size()).sum();
        prop_assert_eq!(board.count(CellState::Ship), covered);
    }
}
