use seabattle::{Board, CellState, Coord, GameError, BOARD_SIZE};

#[test]
fn cell_access_is_bounds_checked() {
    let mut board = Board::new();
    assert_eq!(board.cell_at(9, 9), Ok(CellState::Empty));
    assert_eq!(
        board.cell_at(10, 0),
        Err(GameError::OutOfBounds { row: 10, col: 0 })
    );
    assert_eq!(
        board.set_cell(0, 10, CellState::Ship),
        Err(GameError::OutOfBounds { row: 0, col: 10 })
    );
    board.set_cell(4, 7, CellState::Miss).unwrap();
    assert_eq!(board.cell_at(4, 7), Ok(CellState::Miss));
    assert_eq!(board.count(CellState::Miss), 1);
}

#[test]
fn coord_text_form() {
    let c: Coord = "B5".parse().unwrap();
    assert_eq!((c.row(), c.col()), (4, 1));
    assert_eq!(c.to_string(), "B5");
    assert_eq!("j10".parse::<Coord>().unwrap(), Coord::new(9, 9).unwrap());
    for bad in ["", "A", "A0", "A11", "K1", "11", "AA"] {
        assert!(bad.parse::<Coord>().is_err(), "{} should not parse", bad);
    }
}

#[test]
fn neighbourhood_respects_edges() {
    assert_eq!(Coord::new(0, 0).unwrap().neighbors().count(), 3);
    assert_eq!(Coord::new(0, 5).unwrap().neighbors().count(), 5);
    assert_eq!(Coord::new(5, 5).unwrap().neighbors().count(), 8);
    assert_eq!(Coord::new(5, 5).unwrap().orthogonal().count(), 4);
    assert_eq!(Coord::all().count(), (BOARD_SIZE as usize).pow(2));
}

#[test]
fn overlay_hides_intact_ships() {
    let mut board = Board::new();
    board.set_cell(0, 0, CellState::Ship).unwrap();
    board.set_cell(0, 1, CellState::Hit).unwrap();
    board.set_cell(5, 5, CellState::Miss).unwrap();
    board.set_cell(9, 9, CellState::Sunk).unwrap();

    let overlay = board.overlay();
    assert_eq!(overlay.cell_at(0, 0), Ok(CellState::Empty));
    assert_eq!(overlay.cell_at(0, 1), Ok(CellState::Hit));
    assert_eq!(overlay.cell_at(5, 5), Ok(CellState::Miss));
    assert_eq!(overlay.cell_at(9, 9), Ok(CellState::Sunk));
    assert_eq!(overlay.count(CellState::Ship), 0);
}
