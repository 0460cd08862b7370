#![cfg(feature = "std")]

//! Live sessions keyed by id, the player -> session binding, and the versus
//! lobby queue.
//!
//! The table lock is a plain `std::sync::Mutex` held only for map lookups and
//! never across an await. Each session sits behind its own
//! `tokio::sync::Mutex`, which is what serializes actions on one match.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use rand::Rng;

use crate::session::{GameSession, PlayerId, SessionId};

pub type SharedSession = Arc<tokio::sync::Mutex<GameSession>>;

#[derive(Default)]
struct Tables {
    sessions: HashMap<SessionId, SharedSession>,
    active: HashMap<PlayerId, SessionId>,
    waiting: Option<PlayerId>,
}

impl Tables {
    /// Drop `player`'s binding, and the session once nobody is bound to it.
    fn unbind(&mut self, player: &str) -> Option<SessionId> {
        let id = self.active.remove(player)?;
        if !self.active.values().any(|other| *other == id) {
            self.sessions.remove(&id);
            debug!("session {} dropped", id);
        }
        Some(id)
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    tables: Mutex<Tables>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the guard leaves only plain maps behind.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fresh random session id.
    pub fn new_session_id() -> SessionId {
        let mut bytes = [0u8; 8];
        rand::rng().fill(&mut bytes);
        hex::encode(bytes)
    }

    /// Register a session and bind every human seated in it, replacing any
    /// session those players were bound to before. A session already live
    /// under the same id is returned instead of a second copy.
    pub fn insert(&self, session: GameSession) -> SharedSession {
        let id = session.id().to_string();
        let players: Vec<PlayerId> = session.players().map(str::to_string).collect();
        let mut tables = self.tables();

        if let Some(existing) = tables.sessions.get(&id).cloned() {
            for player in players {
                if tables.active.get(&player) != Some(&id) {
                    tables.unbind(&player);
                    tables.active.insert(player, id.clone());
                }
            }
            return existing;
        }

        for player in players.iter() {
            tables.unbind(player);
        }
        let shared = Arc::new(tokio::sync::Mutex::new(session));
        tables.sessions.insert(id.clone(), shared.clone());
        for player in players {
            tables.active.insert(player, id.clone());
        }
        debug!("session {} registered", id);
        shared
    }

    /// Register a loaded session on behalf of `player`. The loaded state
    /// replaces any live session under the same id. Other humans seated in it
    /// are bound only if they are not already in another session.
    pub fn resume(&self, session: GameSession, player: &str) -> SharedSession {
        let id = session.id().to_string();
        let others: Vec<PlayerId> = session
            .players()
            .filter(|p| *p != player)
            .map(str::to_string)
            .collect();
        let mut tables = self.tables();

        if tables.active.get(player) != Some(&id) {
            tables.unbind(player);
        }
        let shared = Arc::new(tokio::sync::Mutex::new(session));
        if tables.sessions.insert(id.clone(), shared.clone()).is_some() {
            debug!("session {} rolled back to its save by {}", id, player);
        } else {
            debug!("session {} resumed by {}", id, player);
        }
        tables.active.insert(player.to_string(), id.clone());
        for other in others {
            tables.active.entry(other).or_insert_with(|| id.clone());
        }
        shared
    }

    pub fn get(&self, id: &str) -> Option<SharedSession> {
        self.tables().sessions.get(id).cloned()
    }

    /// Session `player` is currently bound to.
    pub fn session_for(&self, player: &str) -> Option<SharedSession> {
        let tables = self.tables();
        let id = tables.active.get(player)?;
        tables.sessions.get(id).cloned()
    }

    /// Id of the session `player` is bound to.
    pub fn bound_id(&self, player: &str) -> Option<SessionId> {
        self.tables().active.get(player).cloned()
    }

    /// Unbind `player`; returns the id it was bound to.
    pub fn detach(&self, player: &str) -> Option<SessionId> {
        self.tables().unbind(player)
    }

    pub fn len(&self) -> usize {
        self.tables().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue `player` for a versus match. Returns the queued opponent when
    /// one was waiting; otherwise `player` becomes the one waiting.
    pub fn enqueue_versus(&self, player: &str) -> Option<PlayerId> {
        let mut tables = self.tables();
        match tables.waiting.take() {
            Some(waiting) if waiting != player => Some(waiting),
            _ => {
                tables.waiting = Some(player.to_string());
                None
            }
        }
    }

    /// Leave the versus queue. `true` if `player` was the one waiting.
    pub fn cancel_wait(&self, player: &str) -> bool {
        let mut tables = self.tables();
        if tables.waiting.as_deref() == Some(player) {
            tables.waiting = None;
            true
        } else {
            false
        }
    }

    pub fn is_waiting(&self, player: &str) -> bool {
        self.tables().waiting.as_deref() == Some(player)
    }
}
