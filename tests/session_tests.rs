mod common;

use common::{at, ship_cells, standard_layout};
use rand::{rngs::SmallRng, SeedableRng};
use seabattle::{
    CellState, Coord, Difficulty, FinishReason, GameError, GameMode, GameSession, Occupant, Orientation,
    Phase, Seat, SessionEvent, ShipPlacement,
};

fn battling() -> GameSession {
    let mut session = GameSession::versus("s1".into(), "alice".into(), "bob".into());
    assert!(session.ready_with_layout(Seat::One, &standard_layout(), None).unwrap().is_empty());
    let events = session.ready_with_layout(Seat::Two, &standard_layout(), None).unwrap();
    assert_eq!(events, vec![SessionEvent::GameStarted { first_turn: Seat::One }]);
    session
}

#[test]
fn seats_and_players() {
    let session = GameSession::versus("s1".into(), "alice".into(), "bob".into());
    assert_eq!(session.seat_of("alice"), Some(Seat::One));
    assert_eq!(session.seat_of("bob"), Some(Seat::Two));
    assert_eq!(session.seat_of("carol"), None);
    assert_eq!(session.players().collect::<Vec<_>>(), vec!["alice", "bob"]);
    assert_eq!(session.phase(), Phase::Placing);
}

#[test]
fn sinking_a_single_cell_ship_keeps_the_turn() {
    let mut session = battling();
    let events = session.shoot(Seat::One, at(3, 3)).unwrap();
    assert_eq!(
        events,
        vec![
            SessionEvent::ShotResolved { shooter: Seat::One, at: at(3, 3), hit: true },
            SessionEvent::ShipSunk { owner: Seat::Two, cells: vec![at(3, 3)] },
        ]
    );
    assert_eq!(session.turn(), Seat::One);
    assert_eq!(session.overlay(Seat::One).get(at(3, 3)), CellState::Sunk);
    assert_eq!(session.remaining_ships(Seat::Two), [3, 3, 2, 1]);
}

#[test]
fn miss_passes_the_turn() {
    let mut session = battling();
    let events = session.shoot(Seat::One, at(9, 0)).unwrap();
    assert_eq!(
        events,
        vec![
            SessionEvent::ShotResolved { shooter: Seat::One, at: at(9, 0), hit: false },
            SessionEvent::TurnPassed { to: Seat::Two },
        ]
    );
    assert_eq!(session.shoot(Seat::One, at(9, 1)), Err(GameError::OutOfTurn));
    session.shoot(Seat::Two, at(9, 0)).unwrap();
    assert_eq!(session.turn(), Seat::One);
}

#[test]
fn rejected_shots_leave_the_session_alone() {
    let mut session = battling();
    session.shoot(Seat::One, at(0, 0)).unwrap();
    let before = session.clone();
    assert_eq!(session.shoot(Seat::One, at(0, 0)), Err(GameError::AlreadyShot));
    assert_eq!(session.shoot(Seat::Two, at(5, 5)), Err(GameError::OutOfTurn));
    assert_eq!(
        session.shoot(Seat::One, Coord { row: 10, col: 0 }),
        Err(GameError::OutOfBounds { row: 10, col: 0 })
    );
    assert_eq!(
        session.shoot(Seat::One, Coord { row: 3, col: 200 }),
        Err(GameError::OutOfBounds { row: 3, col: 200 })
    );
    assert_eq!(session, before);
}

#[test]
fn destroying_the_fleet_finishes_the_game() {
    let mut session = battling();
    let mut last = Vec::new();
    for cell in ship_cells(&standard_layout()) {
        last = session.shoot(Seat::One, cell).unwrap();
    }
    assert_eq!(
        last.last(),
        Some(&SessionEvent::GameOver { winner: Seat::One, reason: FinishReason::FleetDestroyed })
    );
    assert_eq!(session.winner(), Some(Seat::One));
    assert_eq!(session.shoot(Seat::One, at(9, 0)), Err(GameError::WrongPhase));
    assert_eq!(session.forfeit(Seat::Two), Err(GameError::WrongPhase));

    let view = session.snapshot(Seat::Two);
    assert!(view.game_over());
    assert_eq!(view.you_won(), Some(false));
    assert_eq!(view.own_remaining, [0; 4]);
}

#[test]
fn forfeit_hands_the_win_over() {
    let mut session = battling();
    let events = session.forfeit(Seat::One).unwrap();
    assert_eq!(
        events,
        vec![SessionEvent::GameOver { winner: Seat::Two, reason: FinishReason::Forfeit }]
    );
    assert_eq!(
        session.phase(),
        Phase::Finished { winner: Seat::Two, reason: FinishReason::Forfeit }
    );
}

#[test]
fn fleet_rules_during_placement() {
    let mut session = GameSession::versus("s1".into(), "alice".into(), "bob".into());
    assert_eq!(session.shoot(Seat::One, at(0, 0)), Err(GameError::WrongPhase));
    assert_eq!(session.ready(Seat::One), Err(GameError::IncompleteFleet));

    session
        .place_ship(Seat::One, ShipPlacement::new(at(0, 0), 4, Orientation::Vertical))
        .unwrap();
    assert_eq!(
        session.remove_ship(Seat::One, at(2, 0)).unwrap(),
        ShipPlacement::new(at(0, 0), 4, Orientation::Vertical)
    );
    assert_eq!(
        session.ready_with_layout(Seat::One, &standard_layout()[1..], None),
        Err(GameError::IncompleteFleet)
    );
    assert!(session.fleet(Seat::One).is_empty(), "rejected layout is not applied");

    let mut rng = SmallRng::seed_from_u64(3);
    session.auto_place(Seat::One, &mut rng).unwrap();
    session.ready(Seat::One).unwrap();
    assert_eq!(
        session.place_ship(Seat::One, ShipPlacement::new(at(9, 9), 1, Orientation::Vertical)),
        Err(GameError::FleetLocked)
    );
    assert_eq!(session.clear_ships(Seat::One), Err(GameError::FleetLocked));
    assert_eq!(session.phase(), Phase::Placing);
}

#[test]
fn snapshot_hides_opponent_ships() {
    let mut session = battling();
    session.shoot(Seat::One, at(0, 0)).unwrap();
    let view = session.snapshot(Seat::One);
    assert_eq!(view.overlay.count(CellState::Ship), 0);
    assert_eq!(view.overlay.get(at(0, 0)), CellState::Hit);
    assert_eq!(view.own_board.count(CellState::Ship), 20);
    assert_eq!(view.own_ships.len(), 10);
    assert!(view.your_turn);
    assert_eq!(view.opponent_name, "bob");
    assert!(!session.snapshot(Seat::Two).your_turn);
}

#[test]
fn placement_progress_stays_private() {
    let mut session = GameSession::versus("s1".into(), "alice".into(), "bob".into());
    let layout = standard_layout();
    session.place_ship(Seat::Two, layout[0]).unwrap();
    assert_eq!(session.snapshot(Seat::One).opponent_remaining, [4, 3, 2, 1]);
    assert_eq!(session.snapshot(Seat::Two).own_remaining, [0, 0, 0, 1]);

    let mut session = battling();
    session.shoot(Seat::One, at(3, 3)).unwrap();
    assert_eq!(session.snapshot(Seat::One).opponent_remaining, [3, 3, 2, 1]);
}

#[test]
fn practice_against_the_computer() {
    let mut rng = SmallRng::seed_from_u64(11);
    let mut session =
        GameSession::practice("p1".into(), "alice".into(), Difficulty::Easy, &mut rng).unwrap();
    assert!(session.is_ready(Seat::Two));
    assert_eq!(session.players().count(), 1);

    session
        .ready_with_layout(Seat::One, &standard_layout(), Some(Difficulty::Hard))
        .unwrap();
    assert_eq!(session.mode(), GameMode::Practice(Difficulty::Hard));
    assert_eq!(session.occupant(Seat::Two), &Occupant::Computer(Difficulty::Hard));
    assert_eq!(session.phase(), Phase::Battling);

    // sweep the board row by row; either side may win
    let targets: Vec<_> = seabattle::Coord::all().collect();
    let mut next = targets.into_iter();
    while session.phase() == Phase::Battling {
        if session.turn() == Seat::One {
            let target = next.next().unwrap();
            session.shoot(Seat::One, target).unwrap();
        } else {
            let events = session.play_computer_turns(&mut rng);
            assert!(!events.is_empty());
            assert!(session.turn() == Seat::One || session.winner().is_some());
        }
    }
    assert!(session.winner().is_some());
    let computer_shots = session.overlay(Seat::Two).count(CellState::Miss)
        + session.overlay(Seat::Two).count(CellState::Hit)
        + session.overlay(Seat::Two).count(CellState::Sunk);
    assert!(computer_shots >= 1);
}
