use proptest::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use seabattle::placement::random_layout;
use seabattle::{CellState, Coord, GameSession, Phase, Seat, SessionEvent, BOARD_SIZE};

fn random_battle(seed: u64) -> (GameSession, SmallRng) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut session = GameSession::versus("prop".into(), "alice".into(), "bob".into());
    for seat in [Seat::One, Seat::Two] {
        let layout = random_layout(&mut rng).unwrap();
        session.ready_with_layout(seat, &layout, None).unwrap();
    }
    (session, rng)
}

fn random_coord(rng: &mut SmallRng) -> Coord {
    Coord::new(
        rng.random_range(0..BOARD_SIZE as usize),
        rng.random_range(0..BOARD_SIZE as usize),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Random shooting, repeats included, always ends with one winner and
    /// never breaks the turn or sinking rules along the way.
    #[test]
    fn random_games_terminate_consistently(seed in any::<u64>()) {
        let (mut session, mut rng) = random_battle(seed);
        let mut accepted = 0usize;

        while session.phase() == Phase::Battling {
            let shooter = session.turn();
            let target = random_coord(&mut rng);
            let before = session.clone();
            let events = match session.shoot(shooter, target) {
                Ok(events) => events,
                Err(_) => {
                    prop_assert_eq!(&session, &before);
                    continue;
                }
            };
            accepted += 1;
            prop_assert!(accepted <= 200, "every cell can be shot once per side");

            let hit = match events.first() {
                Some(SessionEvent::ShotResolved { hit, shooter: s, at }) => {
                    prop_assert_eq!(*s, shooter);
                    prop_assert_eq!(*at, target);
                    *hit
                }
                other => return Err(TestCaseError::fail(format!("unexpected {:?}", other))),
            };
            let finished = matches!(events.last(), Some(SessionEvent::GameOver { .. }));
            if hit && !finished {
                prop_assert_eq!(session.turn(), shooter);
            } else if !hit {
                prop_assert_eq!(session.turn(), shooter.opponent());
            }

            for event in events.iter() {
                if let SessionEvent::ShipSunk { owner, cells } = event {
                    prop_assert_eq!(*owner, shooter.opponent());
                    for &cell in cells {
                        prop_assert_eq!(session.board(*owner).get(cell), CellState::Sunk);
                        prop_assert_eq!(session.overlay(shooter).get(cell), CellState::Sunk);
                    }
                }
            }
            prop_assert_eq!(session.overlay(shooter).count(CellState::Ship), 0);
        }

        let winner = session.winner().unwrap();
        prop_assert!(session.fleet(winner.opponent()).all_sunk());
        prop_assert!(!session.fleet(winner).all_sunk());
    }
}
