#![cfg(feature = "std")]

//! Client side of the protocol: a local mirror of the game kept current by a
//! phase-scoped dispatch table, and typed request helpers on top of any
//! [`Transport`].

use log::debug;
use rand::Rng;
use serde::Serialize;

use crate::ai::{self, Difficulty};
use crate::auth::SessionToken;
use crate::board::{CellState, Coord};
use crate::config::MAX_SHIP_SIZE;
use crate::persistence::SaveInfo;
use crate::protocol::{ConnPhase, Message, MessageKind, PROTOCOL_VERSION};
use crate::session::{FinishReason, GameMode, GameSnapshot, Phase};
use crate::ship::ShipPlacement;
use crate::transport::Transport;

/// What an incoming message meant to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    LoggedIn { username: String, resuming: bool },
    Registered { username: String },
    TokenIssued,
    AuthFailed(String),
    Waiting,
    GameUpdated,
    GameStarted,
    ShotResolved { at: Coord, hit: bool },
    OpponentShot { at: Coord, hit: bool },
    ShipSunk { cells: Vec<Coord>, own_fleet: bool },
    GameOver { you_won: bool },
    Saves,
    Saved(String),
    Rejected(String),
    /// Not expected in the current phase; the mirror is untouched.
    Ignored(MessageKind),
}

/// Everything the client knows, rebuilt from server messages only.
#[derive(Debug, Clone)]
pub struct ClientState {
    pub phase: ConnPhase,
    pub username: Option<String>,
    pub token: Option<SessionToken>,
    pub game: Option<GameSnapshot>,
    pub saves: Vec<SaveInfo>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            phase: ConnPhase::Authenticating,
            username: None,
            token: None,
            game: None,
            saves: Vec::new(),
        }
    }
}

type Handler = fn(&mut ClientState, Message) -> ClientEvent;

/// Which handler owns `kind` while in `phase`. `None` means the message is
/// ignored.
fn handler_for(phase: ConnPhase, kind: MessageKind) -> Option<Handler> {
    use ConnPhase as P;
    use MessageKind as K;
    let handler: Handler = match (phase, kind) {
        (_, K::Error) => on_error,
        (P::Authenticating | P::Lobby, K::LoginSuccess) => on_login,
        (P::Authenticating, K::LoginFail | K::RegisterFail) => on_auth_failed,
        (P::Authenticating, K::RegisterSuccess) => on_registered,
        (_, K::AuthToken) => on_token,
        (P::Lobby | P::Waiting | P::Placing | P::Battling | P::Finished, K::GameState) => {
            on_game_state
        }
        (P::Lobby | P::Finished, K::WaitingForOpponent) => on_waiting,
        (P::Lobby | P::Finished, K::GameList) => on_game_list,
        (P::Placing, K::GameStart) => on_game_start,
        (P::Battling | P::Finished, K::ShotResult) => on_shot_result,
        (P::Battling, K::OpponentShot) => on_opponent_shot,
        (P::Battling, K::ShipSunk) => on_ship_sunk,
        (P::Placing | P::Battling, K::GameOver) => on_game_over,
        (P::Battling | P::Finished, K::SaveAck) => on_save_ack,
        _ => return None,
    };
    Some(handler)
}

fn on_error(_: &mut ClientState, msg: Message) -> ClientEvent {
    match msg {
        Message::Error { message } => ClientEvent::Rejected(message),
        other => ClientEvent::Ignored(other.kind()),
    }
}

fn on_login(state: &mut ClientState, msg: Message) -> ClientEvent {
    match msg {
        Message::LoginSuccess { username, resuming } => {
            state.username = Some(username.clone());
            state.phase = ConnPhase::Lobby;
            ClientEvent::LoggedIn { username, resuming }
        }
        other => ClientEvent::Ignored(other.kind()),
    }
}

fn on_registered(state: &mut ClientState, msg: Message) -> ClientEvent {
    match msg {
        Message::RegisterSuccess { username } => {
            state.username = Some(username.clone());
            state.phase = ConnPhase::Lobby;
            ClientEvent::Registered { username }
        }
        other => ClientEvent::Ignored(other.kind()),
    }
}

fn on_auth_failed(_: &mut ClientState, msg: Message) -> ClientEvent {
    match msg {
        Message::LoginFail { reason } | Message::RegisterFail { reason } => {
            ClientEvent::AuthFailed(reason)
        }
        other => ClientEvent::Ignored(other.kind()),
    }
}

fn on_token(state: &mut ClientState, msg: Message) -> ClientEvent {
    match msg {
        Message::AuthToken { token } => {
            state.token = Some(token);
            ClientEvent::TokenIssued
        }
        other => ClientEvent::Ignored(other.kind()),
    }
}

fn on_game_state(state: &mut ClientState, msg: Message) -> ClientEvent {
    match msg {
        Message::GameState(snapshot) => {
            state.phase = ConnPhase::of_game(snapshot.phase);
            state.game = Some(snapshot);
            ClientEvent::GameUpdated
        }
        other => ClientEvent::Ignored(other.kind()),
    }
}

fn on_waiting(state: &mut ClientState, _: Message) -> ClientEvent {
    state.phase = ConnPhase::Waiting;
    state.game = None;
    ClientEvent::Waiting
}

fn on_game_list(state: &mut ClientState, msg: Message) -> ClientEvent {
    match msg {
        Message::GameList { saves } => {
            state.saves = saves;
            ClientEvent::Saves
        }
        other => ClientEvent::Ignored(other.kind()),
    }
}

fn on_game_start(state: &mut ClientState, msg: Message) -> ClientEvent {
    match msg {
        Message::GameStart(snapshot) => {
            state.phase = ConnPhase::of_game(snapshot.phase);
            state.game = Some(snapshot);
            ClientEvent::GameStarted
        }
        other => ClientEvent::Ignored(other.kind()),
    }
}

/// Marks a shot without downgrading a cell already known to be sunk.
fn mark(cell: &mut CellState, hit: bool) {
    if *cell != CellState::Sunk {
        *cell = if hit { CellState::Hit } else { CellState::Miss };
    }
}

fn on_shot_result(state: &mut ClientState, msg: Message) -> ClientEvent {
    let (at, hit) = match msg {
        Message::ShotResult { at, hit } => (at, hit),
        other => return ClientEvent::Ignored(other.kind()),
    };
    if let (Some(game), Ok(at)) = (state.game.as_mut(), at.checked()) {
        let mut cell = game.overlay.get(at);
        mark(&mut cell, hit);
        game.overlay.set(at, cell);
        game.your_turn = hit && game.phase == Phase::Battling;
    }
    ClientEvent::ShotResolved { at, hit }
}

fn on_opponent_shot(state: &mut ClientState, msg: Message) -> ClientEvent {
    let (at, hit) = match msg {
        Message::OpponentShot { at, hit } => (at, hit),
        other => return ClientEvent::Ignored(other.kind()),
    };
    if let (Some(game), Ok(at)) = (state.game.as_mut(), at.checked()) {
        let mut cell = game.own_board.get(at);
        mark(&mut cell, hit);
        game.own_board.set(at, cell);
        game.your_turn = !hit && game.phase == Phase::Battling;
    }
    ClientEvent::OpponentShot { at, hit }
}

fn on_ship_sunk(state: &mut ClientState, msg: Message) -> ClientEvent {
    let (cells, own_fleet) = match msg {
        Message::ShipSunk { cells, own_fleet } => (cells, own_fleet),
        other => return ClientEvent::Ignored(other.kind()),
    };
    if let Some(game) = state.game.as_mut() {
        let (board, remaining) = if own_fleet {
            (&mut game.own_board, &mut game.own_remaining)
        } else {
            (&mut game.overlay, &mut game.opponent_remaining)
        };
        for at in cells.iter().filter_map(|at| at.checked().ok()) {
            board.set(at, CellState::Sunk);
        }
        if (1..=MAX_SHIP_SIZE).contains(&cells.len()) {
            let count = &mut remaining[cells.len() - 1];
            *count = count.saturating_sub(1);
        }
    }
    ClientEvent::ShipSunk { cells, own_fleet }
}

fn on_game_over(state: &mut ClientState, msg: Message) -> ClientEvent {
    let (you_won, forfeit) = match msg {
        Message::GameOver {
            you_won, forfeit, ..
        } => (you_won, forfeit),
        other => return ClientEvent::Ignored(other.kind()),
    };
    state.phase = ConnPhase::Finished;
    if let Some(game) = state.game.as_mut() {
        game.phase = Phase::Finished {
            winner: if you_won { game.you } else { game.you.opponent() },
            reason: if forfeit {
                FinishReason::Forfeit
            } else {
                FinishReason::FleetDestroyed
            },
        };
        game.your_turn = false;
    }
    ClientEvent::GameOver { you_won }
}

fn on_save_ack(state: &mut ClientState, msg: Message) -> ClientEvent {
    match msg {
        Message::SaveAck { name } => {
            state.phase = ConnPhase::Lobby;
            state.game = None;
            ClientEvent::Saved(name)
        }
        other => ClientEvent::Ignored(other.kind()),
    }
}

impl ClientState {
    /// Fold one server message into the mirror.
    pub fn apply(&mut self, msg: Message) -> ClientEvent {
        let kind = msg.kind();
        match handler_for(self.phase, kind) {
            Some(handler) => handler(self, msg),
            None => {
                debug!("ignoring {:?} while {:?}", kind, self.phase);
                ClientEvent::Ignored(kind)
            }
        }
    }

    pub fn your_turn(&self) -> bool {
        self.game.as_ref().map(|g| g.your_turn).unwrap_or(false)
    }

    pub fn game_over(&self) -> bool {
        self.phase == ConnPhase::Finished
    }
}

/// Ship sizes still afloat, largest first, from per-size counts.
fn sizes_afloat(counts: &[usize; MAX_SHIP_SIZE]) -> Vec<usize> {
    (1..=MAX_SHIP_SIZE)
        .rev()
        .flat_map(|size| std::iter::repeat(size).take(counts[size - 1]))
        .collect()
}

/// Outcome of one automatically played game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    pub won: bool,
    pub shots: usize,
    pub hits: usize,
    pub opponent: String,
}

pub struct GameClient<T: Transport> {
    transport: T,
    state: ClientState,
}

impl<T: Transport> GameClient<T> {
    /// Handshake over a fresh transport.
    pub async fn connect(mut transport: T) -> anyhow::Result<Self> {
        transport
            .send(Message::Handshake {
                version: PROTOCOL_VERSION,
            })
            .await?;
        match transport.recv().await? {
            Message::HandshakeAck { version } if version == PROTOCOL_VERSION => Ok(Self {
                transport,
                state: ClientState::default(),
            }),
            Message::HandshakeAck { version } => Err(anyhow::anyhow!(
                "Protocol version mismatch in HandshakeAck: expected {}, got {}",
                PROTOCOL_VERSION,
                version
            )),
            Message::Error { message } => Err(anyhow::anyhow!(message)),
            other => Err(anyhow::anyhow!(
                "Expected HandshakeAck, got {:?}",
                other.kind()
            )),
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn game(&self) -> Option<&GameSnapshot> {
        self.state.game.as_ref()
    }

    pub async fn send(&mut self, msg: Message) -> anyhow::Result<()> {
        self.transport.send(msg).await
    }

    /// Wait for the next server message and apply it.
    pub async fn next_event(&mut self) -> anyhow::Result<ClientEvent> {
        let msg = self.transport.recv().await?;
        Ok(self.state.apply(msg))
    }

    /// Apply messages until one satisfies `done`. Rejections end the wait
    /// with an error.
    async fn until<F>(&mut self, done: F) -> anyhow::Result<ClientEvent>
    where
        F: Fn(&ClientEvent) -> bool,
    {
        loop {
            let event = self.next_event().await?;
            match event {
                ClientEvent::Rejected(reason) | ClientEvent::AuthFailed(reason) => {
                    return Err(anyhow::anyhow!(reason))
                }
                event if done(&event) => return Ok(event),
                _ => {}
            }
        }
    }

    fn issued_token(&self) -> anyhow::Result<SessionToken> {
        self.state
            .token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no token issued"))
    }

    pub async fn register(&mut self, username: &str, password: &str) -> anyhow::Result<SessionToken> {
        self.send(Message::Register {
            username: username.into(),
            password: password.into(),
        })
        .await?;
        self.until(|e| *e == ClientEvent::TokenIssued).await?;
        self.issued_token()
    }

    pub async fn login(&mut self, username: &str, password: &str) -> anyhow::Result<SessionToken> {
        self.send(Message::Login {
            username: username.into(),
            password: password.into(),
        })
        .await?;
        self.until(|e| *e == ClientEvent::TokenIssued).await?;
        self.issued_token()
    }

    /// Sign in with a token. Returns the game in progress, if there is one.
    pub async fn reconnect(&mut self, token: SessionToken) -> anyhow::Result<Option<GameSnapshot>> {
        self.send(Message::ReconnectToken {
            token: token.clone(),
        })
        .await?;
        let resuming = match self
            .until(|e| matches!(e, ClientEvent::LoggedIn { .. }))
            .await?
        {
            ClientEvent::LoggedIn { resuming, .. } => resuming,
            _ => false,
        };
        self.state.token = Some(token);
        if !resuming {
            return Ok(None);
        }
        self.until(|e| *e == ClientEvent::GameUpdated).await?;
        Ok(self.state.game.clone())
    }

    /// Start a game. A versus game waits here until an opponent pairs up.
    pub async fn start_new_game(&mut self, mode: GameMode) -> anyhow::Result<GameSnapshot> {
        self.send(Message::StartNewGame { mode }).await?;
        self.until(|e| *e == ClientEvent::GameUpdated).await?;
        self.state
            .game
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no game after GameState"))
    }

    /// Submit the fleet. `true` when the battle started straight away,
    /// `false` while the opponent is still placing.
    pub async fn place_ships(
        &mut self,
        fleet: Vec<ShipPlacement>,
        difficulty: Option<Difficulty>,
    ) -> anyhow::Result<bool> {
        self.send(Message::PlaceShips { fleet, difficulty }).await?;
        let event = self
            .until(|e| matches!(e, ClientEvent::GameStarted | ClientEvent::GameUpdated))
            .await?;
        Ok(event == ClientEvent::GameStarted)
    }

    /// Wait for the opponent to finish placing.
    pub async fn await_game_start(&mut self) -> anyhow::Result<()> {
        if self.state.phase == ConnPhase::Placing {
            self.until(|e| matches!(e, ClientEvent::GameStarted | ClientEvent::GameOver { .. }))
                .await?;
        }
        Ok(())
    }

    /// Fire once. Returns whether it hit; by then any sinking or game over
    /// it caused has already been applied.
    pub async fn shoot(&mut self, at: Coord) -> anyhow::Result<bool> {
        self.send(Message::Shot { at }).await?;
        match self
            .until(|e| matches!(e, ClientEvent::ShotResolved { at: a, .. } if *a == at))
            .await?
        {
            ClientEvent::ShotResolved { hit, .. } => Ok(hit),
            _ => Ok(false),
        }
    }

    /// Apply opponent activity until it is our turn or the game is over.
    pub async fn wait_for_turn(&mut self) -> anyhow::Result<()> {
        while !self.state.your_turn() && !self.state.game_over() {
            self.next_event().await?;
        }
        Ok(())
    }

    pub async fn save(&mut self) -> anyhow::Result<String> {
        self.send(Message::SaveGame).await?;
        match self.until(|e| matches!(e, ClientEvent::Saved(_))).await? {
            ClientEvent::Saved(name) => Ok(name),
            _ => Err(anyhow::anyhow!("save was not acknowledged")),
        }
    }

    pub async fn list_saves(&mut self) -> anyhow::Result<Vec<SaveInfo>> {
        self.send(Message::ListSaves).await?;
        self.until(|e| *e == ClientEvent::Saves).await?;
        Ok(self.state.saves.clone())
    }

    pub async fn continue_game(&mut self, name: &str) -> anyhow::Result<GameSnapshot> {
        self.send(Message::ContinueGame { name: name.into() }).await?;
        self.until(|e| *e == ClientEvent::GameUpdated).await?;
        self.state
            .game
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no game after GameState"))
    }

    pub async fn delete_save(&mut self, name: &str) -> anyhow::Result<Vec<SaveInfo>> {
        self.send(Message::DeleteSave { name: name.into() }).await?;
        self.until(|e| *e == ClientEvent::Saves).await?;
        Ok(self.state.saves.clone())
    }

    pub async fn resign(&mut self) -> anyhow::Result<()> {
        self.send(Message::Resign).await?;
        self.until(|e| matches!(e, ClientEvent::GameOver { .. })).await?;
        Ok(())
    }

    /// The server does not answer this one; the mirror moves on its own.
    pub async fn exit_to_lobby(&mut self) -> anyhow::Result<()> {
        self.send(Message::ExitToLobby).await?;
        self.state.phase = ConnPhase::Lobby;
        self.state.game = None;
        Ok(())
    }

    /// Play the battle out, choosing shots the way a computer opponent of
    /// `skill` would. The fleet must already be submitted.
    pub async fn autoplay<R>(&mut self, skill: Difficulty, rng: &mut R) -> anyhow::Result<GameSummary>
    where
        R: Rng + ?Sized + Send,
    {
        self.await_game_start().await?;
        let mut shots = 0;
        let mut hits = 0;
        loop {
            self.wait_for_turn().await?;
            if self.state.game_over() {
                break;
            }
            let game = self
                .state
                .game
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("no game to play"))?;
            let remaining = sizes_afloat(&game.opponent_remaining);
            let target = ai::choose_target(skill, &game.overlay, &remaining, rng)
                .ok_or_else(|| anyhow::anyhow!("no cell left to shoot"))?;
            shots += 1;
            if self.shoot(target).await? {
                hits += 1;
            }
        }
        let game = self
            .state
            .game
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no game to summarize"))?;
        Ok(GameSummary {
            won: game.you_won().unwrap_or(false),
            shots,
            hits,
            opponent: game.opponent_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn afloat_sizes_largest_first() {
        assert_eq!(sizes_afloat(&[1, 0, 2, 1]), vec![4, 3, 3, 1]);
        assert!(sizes_afloat(&[0; MAX_SHIP_SIZE]).is_empty());
    }

    #[test]
    fn shots_are_ignored_outside_battle() {
        let mut state = ClientState::default();
        let at = Coord::new(0, 0).unwrap();
        assert_eq!(
            state.apply(Message::ShotResult { at, hit: true }),
            ClientEvent::Ignored(MessageKind::ShotResult)
        );
        assert_eq!(
            state.apply(Message::error("nope")),
            ClientEvent::Rejected("nope".into())
        );
    }
}
