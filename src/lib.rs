#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod ai;
mod board;
mod common;
mod config;
mod fleet;
pub mod placement;
mod session;
mod ship;
mod shot;

#[cfg(feature = "std")]
mod auth;
#[cfg(feature = "std")]
pub mod cli;
#[cfg(feature = "std")]
mod client;
#[cfg(feature = "std")]
mod logging;
#[cfg(feature = "std")]
mod persistence;
#[cfg(feature = "std")]
pub mod protocol;
#[cfg(feature = "std")]
mod registry;
#[cfg(feature = "std")]
mod server;
#[cfg(feature = "std")]
pub mod transport;

pub mod prelude;

pub use ai::*;
pub use board::*;
pub use common::*;
pub use config::*;
pub use fleet::*;
pub use placement::{auto_place, can_place, place, validate_layout};
pub use session::*;
pub use ship::*;
pub use shot::*;

#[cfg(feature = "std")]
pub use auth::*;
#[cfg(feature = "std")]
pub use client::*;
#[cfg(feature = "std")]
pub use logging::{init_logging, LOG_ENV};
#[cfg(feature = "std")]
pub use persistence::*;
#[cfg(feature = "std")]
pub use protocol::{ConnPhase, Message, MessageKind, PROTOCOL_VERSION};
#[cfg(feature = "std")]
pub use registry::*;
#[cfg(feature = "std")]
pub use server::*;
#[cfg(feature = "std")]
pub use transport::tcp::MAX_MESSAGE_SIZE;
#[cfg(feature = "std")]
pub use transport::{InMemoryTransport, TcpTransport, Transport};
