mod common;

use common::at;
use rand::{rngs::SmallRng, SeedableRng};
use seabattle::{calc_pdf, choose_target, Board, CellState, Coord, Difficulty, FLEET_SIZES};

fn overlay(marks: &[(usize, usize, CellState)]) -> Board {
    let mut board = Board::new();
    for &(row, col, state) in marks {
        board.set(at(row, col), state);
    }
    board
}

/// Targets chosen for the same overlay across many seeds.
fn picks(difficulty: Difficulty, board: &Board, remaining: &[usize]) -> Vec<Coord> {
    (0..200)
        .map(|seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            choose_target(difficulty, board, remaining, &mut rng).unwrap()
        })
        .collect()
}

#[test]
fn easy_only_shoots_open_water() {
    let mut board = Board::new();
    for cell in Coord::all().filter(|c| c.row() < 9) {
        board.set(cell, CellState::Miss);
    }
    board.set(at(4, 4), CellState::Sunk);
    for target in picks(Difficulty::Easy, &board, &FLEET_SIZES) {
        assert_eq!(target.row(), 9, "{} was already shot", target);
    }

    for cell in Coord::all() {
        board.set(cell, CellState::Miss);
    }
    let mut rng = SmallRng::seed_from_u64(1);
    assert_eq!(choose_target(Difficulty::Easy, &board, &FLEET_SIZES, &mut rng), None);
}

#[test]
fn normal_finishes_a_damaged_ship() {
    let board = overlay(&[(4, 4, CellState::Hit), (4, 5, CellState::Miss)]);
    let around = [at(3, 4), at(5, 4), at(4, 3)];
    let chosen = picks(Difficulty::Normal, &board, &FLEET_SIZES);
    assert!(chosen.iter().all(|t| around.contains(t)), "{:?}", chosen);
    assert!(around.iter().all(|c| chosen.contains(c)), "every open side gets tried");
}

#[test]
fn normal_stays_on_the_line_of_two_hits() {
    let board = overlay(&[(2, 6, CellState::Hit), (3, 6, CellState::Hit)]);
    for target in picks(Difficulty::Normal, &board, &FLEET_SIZES) {
        assert!(target == at(1, 6) || target == at(4, 6), "{} is off the line", target);
    }
}

#[test]
fn normal_hunts_clear_of_sunk_ships() {
    let mut board = overlay(&[(0, 0, CellState::Sunk)]);
    for cell in Coord::all().filter(|c| c.row() > 2) {
        board.set(cell, CellState::Miss);
    }
    // Rows 0-2 minus the sunk ship and its halo.
    for target in picks(Difficulty::Normal, &board, &FLEET_SIZES) {
        assert!(target.row() <= 2);
        assert!(!(target.row() <= 1 && target.col() <= 1), "{} touches the wreck", target);
    }
}

#[test]
fn hard_gives_no_weight_to_known_water() {
    let board = overlay(&[(0, 0, CellState::Miss), (5, 5, CellState::Sunk)]);
    let remaining = &FLEET_SIZES[..FLEET_SIZES.len() - 1];
    let pdf = calc_pdf(&board, remaining);

    assert_eq!(pdf[0][0], 0.0);
    assert_eq!(pdf[5][5], 0.0);
    for halo in at(5, 5).neighbors() {
        assert_eq!(pdf[halo.row()][halo.col()], 0.0, "{} borders the wreck", halo);
    }
    assert!(pdf[9][9] > 0.0);
    let total: f64 = pdf.iter().flat_map(|row| row.iter()).sum();
    assert!((total - 1.0).abs() < 1e-9);

    for target in picks(Difficulty::Hard, &board, remaining) {
        assert!(pdf[target.row()][target.col()] > 0.0, "{} has no weight", target);
    }
}

#[test]
fn hard_favours_the_cells_next_to_a_hit() {
    let board = overlay(&[(6, 2, CellState::Hit)]);
    let pdf = calc_pdf(&board, &FLEET_SIZES);
    let best = Coord::all()
        .max_by(|a, b| pdf[a.row()][a.col()].total_cmp(&pdf[b.row()][b.col()]))
        .unwrap();
    assert!(at(6, 2).orthogonal().any(|n| n == best), "best guess {}", best);
    for diagonal in [at(5, 1), at(5, 3), at(7, 1), at(7, 3)] {
        assert_eq!(pdf[diagonal.row()][diagonal.col()], 0.0);
    }
}
