//! One match between two seats: placement, battle, completion.
//!
//! A `GameSession` is plain data with no interior locking. The registry wraps
//! each one in its own mutex so every operation below runs as a single
//! writer and is applied whole or not at all.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};
use rand::Rng;

use crate::ai::{self, Difficulty};
use crate::board::{Board, Coord};
use crate::common::GameError;
use crate::config::{required_count, MAX_SHIP_SIZE};
use crate::fleet::Fleet;
use crate::placement;
use crate::ship::ShipPlacement;
use crate::shot::resolve_shot;

/// Opaque player identity handed over by the auth collaborator.
pub type PlayerId = String;

/// Stable identifier of a session, used for reconnect and saves.
pub type SessionId = String;

/// Name shown for the computer seat.
pub const COMPUTER_NAME: &str = "computer";

/// One of the two sides of a session. `One` is the creator and shoots first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    pub fn opponent(self) -> Seat {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }

    fn index(self) -> usize {
        match self {
            Seat::One => 0,
            Seat::Two => 1,
        }
    }
}

/// Who plays a seat.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum Occupant {
    Human(PlayerId),
    Computer(Difficulty),
}

impl Occupant {
    pub fn name(&self) -> &str {
        match self {
            Occupant::Human(id) => id,
            Occupant::Computer(_) => COMPUTER_NAME,
        }
    }
}

/// How a session was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum GameMode {
    /// Against the computer.
    Practice(Difficulty),
    /// Against another connected player.
    Versus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum FinishReason {
    FleetDestroyed,
    Forfeit,
}

/// Session-wide phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Seats lay out fleets; each has its own ready flag.
    Placing,
    Battling,
    Finished { winner: Seat, reason: FinishReason },
}

/// State change produced by an accepted action, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionEvent {
    GameStarted { first_turn: Seat },
    ShotResolved { shooter: Seat, at: Coord, hit: bool },
    /// `owner` is the seat whose fleet lost the ship.
    ShipSunk { owner: Seat, cells: Vec<Coord> },
    TurnPassed { to: Seat },
    GameOver { winner: Seat, reason: FinishReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
struct SeatState {
    occupant: Occupant,
    board: Board,
    overlay: Board,
    fleet: Fleet,
    ready: bool,
}

impl SeatState {
    fn new(occupant: Occupant) -> Self {
        Self {
            occupant,
            board: Board::new(),
            overlay: Board::new(),
            fleet: Fleet::new(),
            ready: false,
        }
    }
}

/// Per-size counts of a complete fleet. Shown for the opponent until battle,
/// so their placement progress stays private.
fn full_fleet() -> [usize; MAX_SHIP_SIZE] {
    core::array::from_fn(|i| required_count(i + 1))
}

/// Everything a seat is allowed to see of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct GameSnapshot {
    pub session_id: SessionId,
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub phase: Phase,
    pub you: Seat,
    pub opponent_name: String,
    pub own_board: Board,
    pub own_ships: Vec<ShipPlacement>,
    pub overlay: Board,
    pub own_remaining: [usize; MAX_SHIP_SIZE],
    pub opponent_remaining: [usize; MAX_SHIP_SIZE],
    pub ready: bool,
    pub opponent_ready: bool,
    pub your_turn: bool,
}

impl GameSnapshot {
    pub fn game_over(&self) -> bool {
        matches!(self.phase, Phase::Finished { .. })
    }

    /// `Some(true)` when this seat won, `None` while the game runs.
    pub fn you_won(&self) -> Option<bool> {
        match self.phase {
            Phase::Finished { winner, .. } => Some(winner == self.you),
            _ => None,
        }
    }
}

/// The authoritative rules state of one match.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct GameSession {
    id: SessionId,
    mode: GameMode,
    difficulty: Difficulty,
    seats: [SeatState; 2],
    phase: Phase,
    turn: Seat,
}

impl GameSession {
    /// A session against the computer. The computer lays out its fleet and is
    /// ready straight away.
    pub fn practice<R: Rng + ?Sized>(
        id: SessionId,
        creator: PlayerId,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let mut computer = SeatState::new(Occupant::Computer(difficulty));
        placement::auto_place(&mut computer.board, &mut computer.fleet, rng)?;
        computer.fleet.lock();
        computer.ready = true;
        Ok(Self {
            id,
            mode: GameMode::Practice(difficulty),
            difficulty,
            seats: [SeatState::new(Occupant::Human(creator)), computer],
            phase: Phase::Placing,
            turn: Seat::One,
        })
    }

    /// A session between two players; `creator` takes seat one.
    pub fn versus(id: SessionId, creator: PlayerId, opponent: PlayerId) -> Self {
        Self {
            id,
            mode: GameMode::Versus,
            difficulty: Difficulty::default(),
            seats: [
                SeatState::new(Occupant::Human(creator)),
                SeatState::new(Occupant::Human(opponent)),
            ],
            phase: Phase::Placing,
            turn: Seat::One,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Seat that owns the next shot.
    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn winner(&self) -> Option<Seat> {
        match self.phase {
            Phase::Finished { winner, .. } => Some(winner),
            _ => None,
        }
    }

    pub fn occupant(&self, seat: Seat) -> &Occupant {
        &self.seats[seat.index()].occupant
    }

    pub fn is_ready(&self, seat: Seat) -> bool {
        self.seats[seat.index()].ready
    }

    pub fn board(&self, seat: Seat) -> &Board {
        &self.seats[seat.index()].board
    }

    /// What `seat` knows of its opponent's board.
    pub fn overlay(&self, seat: Seat) -> &Board {
        &self.seats[seat.index()].overlay
    }

    pub fn fleet(&self, seat: Seat) -> &Fleet {
        &self.seats[seat.index()].fleet
    }

    /// Seat held by a human player, if any.
    pub fn seat_of(&self, player: &str) -> Option<Seat> {
        [Seat::One, Seat::Two]
            .into_iter()
            .find(|&seat| matches!(self.occupant(seat), Occupant::Human(id) if id == player))
    }

    /// Human players seated in this session.
    pub fn players(&self) -> impl Iterator<Item = &str> {
        self.seats.iter().filter_map(|s| match &s.occupant {
            Occupant::Human(id) => Some(id.as_str()),
            Occupant::Computer(_) => None,
        })
    }

    /// Derived per-size count of ships still afloat for `seat`.
    pub fn remaining_ships(&self, seat: Seat) -> [usize; MAX_SHIP_SIZE] {
        self.fleet(seat).remaining_by_size()
    }

    fn placing_seat(&mut self, seat: Seat) -> Result<&mut SeatState, GameError> {
        if self.phase != Phase::Placing {
            return Err(GameError::WrongPhase);
        }
        let state = &mut self.seats[seat.index()];
        if state.ready {
            return Err(GameError::FleetLocked);
        }
        Ok(state)
    }

    pub fn place_ship(&mut self, seat: Seat, ship: ShipPlacement) -> Result<(), GameError> {
        let state = self.placing_seat(seat)?;
        placement::place(&mut state.board, &mut state.fleet, ship)?;
        Ok(())
    }

    /// Take back the ship covering `at`.
    pub fn remove_ship(&mut self, seat: Seat, at: Coord) -> Result<ShipPlacement, GameError> {
        let state = self.placing_seat(seat)?;
        let ship = placement::remove_placement(&mut state.board, &mut state.fleet, at)?;
        Ok(ship.placement())
    }

    pub fn clear_ships(&mut self, seat: Seat) -> Result<(), GameError> {
        let state = self.placing_seat(seat)?;
        placement::clear_placements(&mut state.board, &mut state.fleet)
    }

    pub fn auto_place<R: Rng + ?Sized>(&mut self, seat: Seat, rng: &mut R) -> Result<(), GameError> {
        let state = self.placing_seat(seat)?;
        placement::auto_place(&mut state.board, &mut state.fleet, rng)
    }

    /// Lock the seat's current fleet. Battle starts once both seats are ready.
    pub fn ready(&mut self, seat: Seat) -> Result<Vec<SessionEvent>, GameError> {
        let state = self.placing_seat(seat)?;
        if !placement::is_complete(&state.fleet) {
            return Err(GameError::IncompleteFleet);
        }
        state.fleet.lock();
        state.ready = true;

        let mut events = Vec::new();
        if self.seats.iter().all(|s| s.ready) {
            self.phase = Phase::Battling;
            self.turn = Seat::One;
            events.push(SessionEvent::GameStarted {
                first_turn: self.turn,
            });
        }
        Ok(events)
    }

    /// Replace the seat's layout with a submitted one and ready it. In
    /// practice mode `difficulty` retunes the computer.
    pub fn ready_with_layout(
        &mut self,
        seat: Seat,
        layout: &[ShipPlacement],
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<SessionEvent>, GameError> {
        self.placing_seat(seat)?;
        let (board, fleet) = placement::validate_layout(layout)?;
        let state = &mut self.seats[seat.index()];
        state.board = board;
        state.fleet = fleet;
        if let (GameMode::Practice(_), Some(level)) = (self.mode, difficulty) {
            self.mode = GameMode::Practice(level);
            self.difficulty = level;
            self.seats[seat.opponent().index()].occupant = Occupant::Computer(level);
        }
        self.ready(seat)
    }

    /// Fire at `at` on behalf of `seat`. A hit keeps the turn, a miss passes
    /// it, destroying the last ship finishes the game.
    pub fn shoot(&mut self, seat: Seat, at: Coord) -> Result<Vec<SessionEvent>, GameError> {
        if self.phase != Phase::Battling {
            return Err(GameError::WrongPhase);
        }
        if self.turn != seat {
            return Err(GameError::OutOfTurn);
        }

        let [one, two] = &mut self.seats;
        let (shooter, target) = match seat {
            Seat::One => (one, two),
            Seat::Two => (two, one),
        };
        let report = resolve_shot(&mut target.board, &mut target.fleet, &mut shooter.overlay, at)?;

        let mut events = Vec::new();
        events.push(SessionEvent::ShotResolved {
            shooter: seat,
            at,
            hit: report.hit,
        });
        if let Some(cells) = report.sunk.clone() {
            events.push(SessionEvent::ShipSunk {
                owner: seat.opponent(),
                cells,
            });
        }
        if report.fleet_destroyed {
            self.phase = Phase::Finished {
                winner: seat,
                reason: FinishReason::FleetDestroyed,
            };
            events.push(SessionEvent::GameOver {
                winner: seat,
                reason: FinishReason::FleetDestroyed,
            });
        } else if !report.retains_turn() {
            self.turn = seat.opponent();
            events.push(SessionEvent::TurnPassed { to: self.turn });
        }
        Ok(events)
    }

    /// Let the computer seat shoot for as long as it owns the turn.
    pub fn play_computer_turns<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while self.phase == Phase::Battling {
            let seat = self.turn;
            let difficulty = match self.occupant(seat) {
                Occupant::Computer(level) => *level,
                Occupant::Human(_) => break,
            };
            let remaining = self.fleet(seat.opponent()).afloat_sizes();
            let target = match ai::choose_target(difficulty, self.overlay(seat), &remaining, rng) {
                Some(target) => target,
                None => break,
            };
            match self.shoot(seat, target) {
                Ok(mut more) => events.append(&mut more),
                Err(_) => break,
            }
        }
        events
    }

    /// Externally triggered forfeit: `seat` gives up and the other seat wins.
    pub fn forfeit(&mut self, seat: Seat) -> Result<Vec<SessionEvent>, GameError> {
        if matches!(self.phase, Phase::Finished { .. }) {
            return Err(GameError::WrongPhase);
        }
        let winner = seat.opponent();
        self.phase = Phase::Finished {
            winner,
            reason: FinishReason::Forfeit,
        };
        let mut events = Vec::new();
        events.push(SessionEvent::GameOver {
            winner,
            reason: FinishReason::Forfeit,
        });
        Ok(events)
    }

    /// Full view of the session from one seat. The opponent's intact ships
    /// never appear in it.
    pub fn snapshot(&self, seat: Seat) -> GameSnapshot {
        let me = &self.seats[seat.index()];
        let them = &self.seats[seat.opponent().index()];
        GameSnapshot {
            session_id: self.id.clone(),
            mode: self.mode,
            difficulty: self.difficulty,
            phase: self.phase,
            you: seat,
            opponent_name: them.occupant.name().into(),
            own_board: me.board,
            own_ships: me.fleet.ships().iter().map(|s| s.placement()).collect(),
            overlay: me.overlay,
            own_remaining: me.fleet.remaining_by_size(),
            opponent_remaining: match self.phase {
                Phase::Placing => full_fleet(),
                _ => them.fleet.remaining_by_size(),
            },
            ready: me.ready,
            opponent_ready: them.ready,
            your_turn: self.phase == Phase::Battling && self.turn == seat,
        }
    }
}
