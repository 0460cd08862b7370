#![cfg(feature = "std")]

//! Saved games. A save is a frozen [`GameSession`] plus who saved it and
//! when; stores are synchronous and the server calls them off the async
//! runtime with `spawn_blocking`.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, TimeZone};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::ai::Difficulty;
use crate::common::GameError;
use crate::session::{GameSession, PlayerId};

const SAVE_EXTENSION: &str = "sav";

/// Listing entry for one save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveInfo {
    pub name: String,
    pub difficulty: Difficulty,
    /// `YYYY-MM-DD`, local time.
    pub date: String,
    /// `HH:MM:SS`, local time.
    pub time: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub player: PlayerId,
    pub difficulty: Difficulty,
    /// Unix seconds.
    pub saved_at: i64,
    pub session: GameSession,
}

impl SavedGame {
    pub fn new(player: PlayerId, session: GameSession) -> Self {
        Self {
            player,
            difficulty: session.difficulty(),
            saved_at: Local::now().timestamp(),
            session,
        }
    }

    /// `<player>_<YYYYMMDD_HHMMSS>`
    pub fn default_name(&self) -> String {
        let stamp = Local
            .timestamp_opt(self.saved_at, 0)
            .single()
            .map(|t| t.format("%Y%m%d_%H%M%S").to_string())
            .unwrap_or_else(|| self.saved_at.to_string());
        format!("{}_{}", self.player, stamp)
    }

    fn info(&self, name: String, size_bytes: u64) -> SaveInfo {
        let (date, time) = match Local.timestamp_opt(self.saved_at, 0).single() {
            Some(t) => (
                t.format("%Y-%m-%d").to_string(),
                t.format("%H:%M:%S").to_string(),
            ),
            None => (String::new(), String::new()),
        };
        SaveInfo {
            name,
            difficulty: self.difficulty,
            date,
            time,
            size_bytes,
        }
    }
}

/// Backing storage for saved games.
pub trait SaveStore: Send + Sync {
    /// Saves owned by `player`, newest first.
    fn list_saves(&self, player: &str) -> Result<Vec<SaveInfo>, GameError>;
    /// Store a save and return the name it was filed under.
    fn save(&self, game: &SavedGame) -> Result<String, GameError>;
    /// `UnknownSession` when nothing is stored under `name`.
    fn load(&self, name: &str) -> Result<SavedGame, GameError>;
    fn delete(&self, name: &str) -> Result<(), GameError>;
}

fn encode_save(game: &SavedGame) -> Result<Vec<u8>, GameError> {
    bincode::serialize(game).map_err(|e| GameError::PersistenceFailure(e.to_string()))
}

fn decode_save(bytes: &[u8]) -> Result<SavedGame, GameError> {
    bincode::deserialize(bytes).map_err(|e| GameError::PersistenceFailure(e.to_string()))
}

/// Save names double as file stems, so nothing that walks the filesystem.
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn newest_first(saves: &mut [SaveInfo]) {
    saves.sort_by(|a, b| (&b.date, &b.time, &b.name).cmp(&(&a.date, &a.time, &a.name)));
}

/// Picks `base`, or `base_2`, `base_3`, ... when taken.
fn free_name(base: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// One bincode file per save under a directory.
pub struct FileSaveStore {
    dir: PathBuf,
}

impl FileSaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, GameError> {
        if !valid_name(name) {
            return Err(GameError::UnknownSession);
        }
        Ok(self.dir.join(format!("{}.{}", name, SAVE_EXTENSION)))
    }
}

fn io_failure(e: std::io::Error) -> GameError {
    if e.kind() == ErrorKind::NotFound {
        GameError::UnknownSession
    } else {
        GameError::PersistenceFailure(e.to_string())
    }
}

impl SaveStore for FileSaveStore {
    fn list_saves(&self, player: &str) -> Result<Vec<SaveInfo>, GameError> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| GameError::PersistenceFailure(e.to_string()))?;
        let mut saves = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SAVE_EXTENSION) {
                continue;
            }
            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("skipping unreadable save {}: {}", path.display(), e);
                    continue;
                }
            };
            match decode_save(&bytes) {
                Ok(game) if game.player == player => {
                    saves.push(game.info(name, bytes.len() as u64));
                }
                Ok(_) => {}
                Err(e) => warn!("skipping corrupt save {}: {}", path.display(), e),
            }
        }
        newest_first(&mut saves);
        Ok(saves)
    }

    fn save(&self, game: &SavedGame) -> Result<String, GameError> {
        let bytes = encode_save(game)?;
        let name = free_name(game.default_name(), |candidate| {
            self.path_for(candidate).map(|p| p.exists()).unwrap_or(false)
        });
        let path = self.path_for(&name)?;
        fs::write(&path, &bytes).map_err(|e| GameError::PersistenceFailure(e.to_string()))?;
        debug!("saved {} ({} bytes)", path.display(), bytes.len());
        Ok(name)
    }

    fn load(&self, name: &str) -> Result<SavedGame, GameError> {
        let bytes = fs::read(self.path_for(name)?).map_err(io_failure)?;
        decode_save(&bytes)
    }

    fn delete(&self, name: &str) -> Result<(), GameError> {
        fs::remove_file(self.path_for(name)?).map_err(io_failure)
    }
}

/// Saves kept in memory as the same bytes a file would hold.
#[derive(Default)]
pub struct MemorySaveStore {
    saves: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>, GameError> {
        self.saves
            .lock()
            .map_err(|_| GameError::PersistenceFailure("save table poisoned".into()))
    }
}

impl SaveStore for MemorySaveStore {
    fn list_saves(&self, player: &str) -> Result<Vec<SaveInfo>, GameError> {
        let saves = self.lock()?;
        let mut out = Vec::new();
        for (name, bytes) in saves.iter() {
            let game = decode_save(bytes)?;
            if game.player == player {
                out.push(game.info(name.clone(), bytes.len() as u64));
            }
        }
        newest_first(&mut out);
        Ok(out)
    }

    fn save(&self, game: &SavedGame) -> Result<String, GameError> {
        let bytes = encode_save(game)?;
        let mut saves = self.lock()?;
        let name = free_name(game.default_name(), |candidate| saves.contains_key(candidate));
        saves.insert(name.clone(), bytes);
        Ok(name)
    }

    fn load(&self, name: &str) -> Result<SavedGame, GameError> {
        let saves = self.lock()?;
        let bytes = saves.get(name).ok_or(GameError::UnknownSession)?;
        decode_save(bytes)
    }

    fn delete(&self, name: &str) -> Result<(), GameError> {
        self.lock()?
            .remove(name)
            .map(|_| ())
            .ok_or(GameError::UnknownSession)
    }
}
