//! Common types for the game rules: the rejection enum shared by every layer.

#[cfg(not(feature = "std"))]
use alloc::string::String;
#[cfg(feature = "std")]
use std::string::String;

/// Reasons an action is rejected. A rejected action never mutates state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum GameError {
    /// Row or column outside `[0, BOARD_SIZE)`.
    OutOfBounds { row: usize, col: usize },
    /// Ship placement breaks bounds, overlap, adjacency or fleet quota rules.
    InvalidPlacement,
    /// Fleet is locked because its owner already signalled ready.
    FleetLocked,
    /// Ready was signalled with a fleet that is not the full composition.
    IncompleteFleet,
    /// Shot submitted by the player who does not own the turn.
    OutOfTurn,
    /// Coordinate was already shot at.
    AlreadyShot,
    /// Action does not belong to the session's current phase.
    WrongPhase,
    /// Player is not seated in the session.
    NotParticipant,
    /// Bad reconnect token or stale save reference.
    UnknownSession,
    /// Storage collaborator failed; session state is unaffected.
    PersistenceFailure(String),
}

impl core::fmt::Display for GameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GameError::OutOfBounds { row, col } => {
                write!(f, "Coordinate ({}, {}) is out of bounds", row, col)
            }
            GameError::InvalidPlacement => write!(f, "Ship cannot be placed there"),
            GameError::FleetLocked => write!(f, "Fleet is locked after ready"),
            GameError::IncompleteFleet => write!(f, "Fleet is incomplete"),
            GameError::OutOfTurn => write!(f, "It is not your turn"),
            GameError::AlreadyShot => write!(f, "This cell was already shot"),
            GameError::WrongPhase => write!(f, "Action not allowed in the current phase"),
            GameError::NotParticipant => write!(f, "Player is not part of this game"),
            GameError::UnknownSession => write!(f, "Unknown or expired game session"),
            GameError::PersistenceFailure(reason) => write!(f, "Storage failure: {}", reason),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GameError {}
