mod common;

use common::{at, standard_layout};
use seabattle::{resolve_shot, validate_layout, Board, CellState, GameError};

#[test]
fn miss_marks_both_boards() {
    let (mut board, mut fleet) = validate_layout(&standard_layout()).unwrap();
    let mut overlay = Board::new();

    let report = resolve_shot(&mut board, &mut fleet, &mut overlay, at(9, 0)).unwrap();
    assert!(!report.hit);
    assert!(!report.retains_turn());
    assert_eq!(board.get(at(9, 0)), CellState::Miss);
    assert_eq!(overlay.get(at(9, 0)), CellState::Miss);
}

#[test]
fn hits_then_sink() {
    let (mut board, mut fleet) = validate_layout(&standard_layout()).unwrap();
    let mut overlay = Board::new();

    let first = resolve_shot(&mut board, &mut fleet, &mut overlay, at(7, 0)).unwrap();
    assert!(first.hit && first.retains_turn());
    assert_eq!(first.sunk, None);
    assert_eq!(overlay.get(at(7, 0)), CellState::Hit);

    let second = resolve_shot(&mut board, &mut fleet, &mut overlay, at(7, 1)).unwrap();
    assert_eq!(second.sunk, Some(vec![at(7, 0), at(7, 1)]));
    assert!(!second.fleet_destroyed);
    for cell in [at(7, 0), at(7, 1)] {
        assert_eq!(board.get(cell), CellState::Sunk);
        assert_eq!(overlay.get(cell), CellState::Sunk);
    }
    assert_eq!(fleet.remaining_by_size(), [4, 2, 2, 1]);
}

#[test]
fn repeated_shot_changes_nothing() {
    let (mut board, mut fleet) = validate_layout(&standard_layout()).unwrap();
    let mut overlay = Board::new();
    resolve_shot(&mut board, &mut fleet, &mut overlay, at(0, 0)).unwrap();
    resolve_shot(&mut board, &mut fleet, &mut overlay, at(9, 0)).unwrap();

    let snapshot = (board, fleet.clone(), overlay);
    for target in [at(0, 0), at(9, 0)] {
        assert_eq!(
            resolve_shot(&mut board, &mut fleet, &mut overlay, target),
            Err(GameError::AlreadyShot)
        );
    }
    assert_eq!((board, fleet, overlay), snapshot);
}

#[test]
fn last_ship_destroys_fleet() {
    let layout = standard_layout();
    let (mut board, mut fleet) = validate_layout(&layout).unwrap();
    let mut overlay = Board::new();

    let cells = common::ship_cells(&layout);
    let (last, rest) = cells.split_last().unwrap();
    for &cell in rest {
        let report = resolve_shot(&mut board, &mut fleet, &mut overlay, cell).unwrap();
        assert!(!report.fleet_destroyed);
    }
    let report = resolve_shot(&mut board, &mut fleet, &mut overlay, *last).unwrap();
    assert!(report.hit && report.fleet_destroyed);
    assert!(!report.retains_turn());
    assert!(fleet.all_sunk());
    assert_eq!(board.count(CellState::Sunk), 20);
}
