#![cfg(feature = "std")]

//! Messages exchanged between a client and the game server, and the bincode
//! codec used to put them on the wire.
//!
//! Ordering guarantee for shots: everything a shot caused for the shooter
//! (`ShipSunk`, `GameOver`) is sent *before* the shooter's `ShotResult`, so a
//! client holding a `ShotResult` already knows the full outcome. Messages for
//! the other seat follow the natural order.

use serde::{Deserialize, Serialize};

use crate::ai::Difficulty;
use crate::auth::SessionToken;
use crate::board::Coord;
use crate::persistence::SaveInfo;
use crate::session::{GameMode, GameSnapshot, Phase};
use crate::ship::ShipPlacement;

pub const PROTOCOL_VERSION: u8 = 1;

/// Every message kind of the protocol with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// First frame of every connection, sent by the client.
    Handshake { version: u8 },
    HandshakeAck { version: u8 },

    Login { username: String, password: String },
    Register { username: String, password: String },
    /// `resuming` is set when a `GameState` for an in-progress game follows.
    LoginSuccess { username: String, resuming: bool },
    LoginFail { reason: String },
    RegisterSuccess { username: String },
    RegisterFail { reason: String },
    AuthToken { token: SessionToken },
    ReconnectToken { token: SessionToken },

    StartNewGame { mode: GameMode },
    /// Sent to a versus player while no opponent is queued.
    WaitingForOpponent,
    /// Full snapshot of the recipient's view of the session.
    GameState(GameSnapshot),
    /// Completed fleet; signals ready. Practice games may retune difficulty.
    PlaceShips {
        fleet: Vec<ShipPlacement>,
        difficulty: Option<Difficulty>,
    },
    GameStart(GameSnapshot),

    Shot { at: Coord },
    ShotResult { at: Coord, hit: bool },
    OpponentShot { at: Coord, hit: bool },
    /// `own_fleet` is set when the sunk ship belonged to the recipient.
    ShipSunk { cells: Vec<Coord>, own_fleet: bool },
    GameOver {
        winner: String,
        you_won: bool,
        forfeit: bool,
    },
    Resign,
    ExitToLobby,

    ListSaves,
    GameList { saves: Vec<SaveInfo> },
    ContinueGame { name: String },
    DeleteSave { name: String },
    SaveGame,
    SaveAck { name: String },

    Error { message: String },
}

/// Payload-free discriminant of [`Message`], the key of dispatch tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Handshake,
    HandshakeAck,
    Login,
    Register,
    LoginSuccess,
    LoginFail,
    RegisterSuccess,
    RegisterFail,
    AuthToken,
    ReconnectToken,
    StartNewGame,
    WaitingForOpponent,
    GameState,
    PlaceShips,
    GameStart,
    Shot,
    ShotResult,
    OpponentShot,
    ShipSunk,
    GameOver,
    Resign,
    ExitToLobby,
    ListSaves,
    GameList,
    ContinueGame,
    DeleteSave,
    SaveGame,
    SaveAck,
    Error,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Handshake { .. } => MessageKind::Handshake,
            Message::HandshakeAck { .. } => MessageKind::HandshakeAck,
            Message::Login { .. } => MessageKind::Login,
            Message::Register { .. } => MessageKind::Register,
            Message::LoginSuccess { .. } => MessageKind::LoginSuccess,
            Message::LoginFail { .. } => MessageKind::LoginFail,
            Message::RegisterSuccess { .. } => MessageKind::RegisterSuccess,
            Message::RegisterFail { .. } => MessageKind::RegisterFail,
            Message::AuthToken { .. } => MessageKind::AuthToken,
            Message::ReconnectToken { .. } => MessageKind::ReconnectToken,
            Message::StartNewGame { .. } => MessageKind::StartNewGame,
            Message::WaitingForOpponent => MessageKind::WaitingForOpponent,
            Message::GameState(_) => MessageKind::GameState,
            Message::PlaceShips { .. } => MessageKind::PlaceShips,
            Message::GameStart(_) => MessageKind::GameStart,
            Message::Shot { .. } => MessageKind::Shot,
            Message::ShotResult { .. } => MessageKind::ShotResult,
            Message::OpponentShot { .. } => MessageKind::OpponentShot,
            Message::ShipSunk { .. } => MessageKind::ShipSunk,
            Message::GameOver { .. } => MessageKind::GameOver,
            Message::Resign => MessageKind::Resign,
            Message::ExitToLobby => MessageKind::ExitToLobby,
            Message::ListSaves => MessageKind::ListSaves,
            Message::GameList { .. } => MessageKind::GameList,
            Message::ContinueGame { .. } => MessageKind::ContinueGame,
            Message::DeleteSave { .. } => MessageKind::DeleteSave,
            Message::SaveGame => MessageKind::SaveGame,
            Message::SaveAck { .. } => MessageKind::SaveAck,
            Message::Error { .. } => MessageKind::Error,
        }
    }

    /// Shorthand for an `Error` reply built from any displayable rejection.
    pub fn error(reason: impl std::fmt::Display) -> Self {
        Message::Error {
            message: reason.to_string(),
        }
    }
}

/// Serialize a message body (without the length prefix).
pub fn encode(msg: &Message) -> anyhow::Result<Vec<u8>> {
    bincode::serialize(msg).map_err(|e| anyhow::anyhow!("Serialization error: {}", e))
}

/// Deserialize a message body (without the length prefix).
pub fn decode(bytes: &[u8]) -> anyhow::Result<Message> {
    bincode::deserialize(bytes).map_err(|e| anyhow::anyhow!("Deserialization error: {}", e))
}

/// Where a connection stands. Both ends track it; each phase has its own set
/// of acceptable messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnPhase {
    Authenticating,
    Lobby,
    /// Queued for a versus opponent.
    Waiting,
    Placing,
    Battling,
    Finished,
}

impl ConnPhase {
    pub fn of_game(phase: Phase) -> Self {
        match phase {
            Phase::Placing => ConnPhase::Placing,
            Phase::Battling => ConnPhase::Battling,
            Phase::Finished { .. } => ConnPhase::Finished,
        }
    }
}

/// Client requests the server handles in `phase`. Anything else is answered
/// with an `Error` and changes nothing.
pub fn server_accepts(phase: ConnPhase) -> &'static [MessageKind] {
    use MessageKind::*;
    match phase {
        ConnPhase::Authenticating => &[Login, Register, ReconnectToken],
        ConnPhase::Lobby => &[
            StartNewGame,
            ListSaves,
            ContinueGame,
            DeleteSave,
            ReconnectToken,
        ],
        ConnPhase::Waiting => &[ExitToLobby],
        ConnPhase::Placing => &[PlaceShips, Resign, ExitToLobby],
        ConnPhase::Battling => &[Shot, SaveGame, Resign, ExitToLobby],
        ConnPhase::Finished => &[StartNewGame, SaveGame, ListSaves, ExitToLobby],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shots_only_while_battling() {
        for phase in [
            ConnPhase::Authenticating,
            ConnPhase::Lobby,
            ConnPhase::Waiting,
            ConnPhase::Placing,
            ConnPhase::Finished,
        ] {
            assert!(!server_accepts(phase).contains(&MessageKind::Shot));
        }
        assert!(server_accepts(ConnPhase::Battling).contains(&MessageKind::Shot));
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Message::SaveGame.kind(), MessageKind::SaveGame);
        assert_eq!(Message::error("nope").kind(), MessageKind::Error);
        assert_eq!(
            Message::Handshake { version: PROTOCOL_VERSION }.kind(),
            MessageKind::Handshake
        );
    }
}
