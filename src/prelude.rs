//! Commonly used types and utilities for ease of import.

pub use crate::{
    choose_target, resolve_shot, validate_layout, Board, CellState, Coord, Difficulty, Fleet,
    GameError, GameSession, Orientation, Seat, ShipPlacement,
};

#[cfg(feature = "std")]
pub use crate::{GameClient, GameServer, Message, ServerConfig};

#[cfg(feature = "std")]
pub use crate::transport::{InMemoryTransport, TcpTransport, Transport};
