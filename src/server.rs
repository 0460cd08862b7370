#![cfg(feature = "std")]

//! TCP game server. One [`Connection`] task per client owns that client's
//! transport; events for the other seat travel through per-player outboxes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;

use crate::auth::{Authenticator, MemoryAuthenticator};
use crate::common::GameError;
use crate::persistence::{FileSaveStore, SaveStore, SavedGame};
use crate::protocol::{server_accepts, ConnPhase, Message, PROTOCOL_VERSION};
use crate::registry::{SessionRegistry, SharedSession};
use crate::session::{
    FinishReason, GameMode, GameSession, Occupant, Phase, PlayerId, Seat, SessionEvent, SessionId,
};
use crate::transport::tcp::{TcpTransport, MAX_MESSAGE_SIZE};
use crate::transport::Transport;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7878";
pub const DEFAULT_SAVE_DIR: &str = "saves";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub save_dir: PathBuf,
    pub max_message_size: u32,
    pub send_timeout: Duration,
    /// Drop clients that stay silent this long; `None` keeps them forever.
    pub idle_timeout: Option<Duration>,
    /// Seeds computer placement and targeting.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            max_message_size: MAX_MESSAGE_SIZE,
            send_timeout: Duration::from_secs(30),
            idle_timeout: None,
            seed: None,
        }
    }
}

/// A message pushed to another player's connection on behalf of a session.
struct Pushed {
    session: SessionId,
    msg: Message,
}

/// Where a handler's output goes.
enum Route {
    Reply(Message),
    Push { to: PlayerId, session: SessionId, msg: Message },
}

struct Shared {
    registry: SessionRegistry,
    auth: Arc<dyn Authenticator>,
    store: Arc<dyn SaveStore>,
    outboxes: Mutex<HashMap<PlayerId, UnboundedSender<Pushed>>>,
    rng: Mutex<SmallRng>,
}

impl Shared {
    fn outboxes(&self) -> MutexGuard<'_, HashMap<PlayerId, UnboundedSender<Pushed>>> {
        self.outboxes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn rng(&self) -> MutexGuard<'_, SmallRng> {
        self.rng.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, to: &str, session: SessionId, msg: Message) {
        match self.outboxes().get(to) {
            Some(tx) => {
                if tx.send(Pushed { session, msg }).is_err() {
                    debug!("outbox of {} is closed", to);
                }
            }
            None => debug!("{} is offline; dropping push", to),
        }
    }
}

#[derive(Clone)]
pub struct GameServer {
    shared: Arc<Shared>,
}

impl GameServer {
    pub fn new(auth: Arc<dyn Authenticator>, store: Arc<dyn SaveStore>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Self {
            shared: Arc::new(Shared {
                registry: SessionRegistry::new(),
                auth,
                store,
                outboxes: Mutex::new(HashMap::new()),
                rng: Mutex::new(rng),
            }),
        }
    }

    /// Server with in-memory accounts and file saves under `config.save_dir`.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let store = FileSaveStore::new(&config.save_dir)?;
        Ok(Self::new(
            Arc::new(MemoryAuthenticator::new()),
            Arc::new(store),
            config.seed,
        ))
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.shared.registry
    }

    /// Bind `config.bind_addr` and serve until the listener fails.
    pub async fn run(&self, config: &ServerConfig) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        info!("listening on {}", listener.local_addr()?);
        self.serve(listener, config).await
    }

    pub async fn serve(&self, listener: TcpListener, config: &ServerConfig) -> anyhow::Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            if let Err(e) = stream.set_nodelay(true) {
                warn!("set_nodelay for {} failed: {}", peer, e);
            }
            let transport = TcpTransport::with_config(
                stream,
                config.send_timeout,
                config.idle_timeout,
                config.max_message_size,
            );
            let server = self.clone();
            tokio::spawn(async move {
                info!("{} connected", peer);
                match server.serve_connection(transport).await {
                    Ok(()) => info!("{} disconnected", peer),
                    Err(e) => warn!("{} dropped: {}", peer, e),
                }
            });
        }
    }

    /// Drive one client connection to completion.
    pub async fn serve_connection<T: Transport>(&self, transport: T) -> anyhow::Result<()> {
        let (outbox_tx, outbox_rx) = unbounded_channel();
        let mut conn = Connection {
            shared: self.shared.clone(),
            transport,
            phase: ConnPhase::Authenticating,
            player: None,
            outbox_tx,
            outbox_rx,
        };
        let result = conn.run().await;
        conn.disconnect();
        result
    }
}

struct Connection<T: Transport> {
    shared: Arc<Shared>,
    transport: T,
    phase: ConnPhase,
    player: Option<PlayerId>,
    outbox_tx: UnboundedSender<Pushed>,
    outbox_rx: UnboundedReceiver<Pushed>,
}

impl<T: Transport> Connection<T> {
    async fn run(&mut self) -> anyhow::Result<()> {
        self.handshake().await?;
        loop {
            tokio::select! {
                incoming = self.transport.recv() => {
                    let msg = match incoming {
                        Ok(msg) => msg,
                        Err(e) => {
                            debug!("connection closed: {}", e);
                            return Ok(());
                        }
                    };
                    self.dispatch(msg).await?;
                }
                Some(pushed) = self.outbox_rx.recv() => {
                    if self.accepts_push(&pushed) {
                        self.send(pushed.msg).await?;
                    }
                }
            }
        }
    }

    async fn handshake(&mut self) -> anyhow::Result<()> {
        match self.transport.recv().await? {
            Message::Handshake { version } if version == PROTOCOL_VERSION => {
                self.transport
                    .send(Message::HandshakeAck {
                        version: PROTOCOL_VERSION,
                    })
                    .await
            }
            Message::Handshake { version } => {
                let reason = format!(
                    "Protocol version mismatch: expected {}, got {}",
                    PROTOCOL_VERSION, version
                );
                self.transport.send(Message::error(&reason)).await?;
                Err(anyhow::anyhow!(reason))
            }
            other => Err(anyhow::anyhow!(
                "Expected Handshake, got {:?}",
                other.kind()
            )),
        }
    }

    /// Outbound messages also move this connection through its phases.
    async fn send(&mut self, msg: Message) -> anyhow::Result<()> {
        match &msg {
            Message::GameState(snapshot) | Message::GameStart(snapshot) => {
                self.phase = ConnPhase::of_game(snapshot.phase);
            }
            Message::GameOver { .. } => self.phase = ConnPhase::Finished,
            Message::WaitingForOpponent => self.phase = ConnPhase::Waiting,
            Message::SaveAck { .. } => self.phase = ConnPhase::Lobby,
            _ => {}
        }
        self.transport.send(msg).await
    }

    /// Pushes belong to the session this player is bound to right now, and
    /// are only shown to a connection that is looking at a game.
    fn accepts_push(&self, pushed: &Pushed) -> bool {
        let bound = match self.player.as_deref() {
            Some(player) => self.shared.registry.bound_id(player),
            None => None,
        };
        if bound.as_deref() != Some(pushed.session.as_str()) {
            return false;
        }
        match self.phase {
            ConnPhase::Authenticating | ConnPhase::Lobby => false,
            ConnPhase::Waiting => matches!(pushed.msg, Message::GameState(_)),
            ConnPhase::Placing | ConnPhase::Battling | ConnPhase::Finished => true,
        }
    }

    async fn dispatch(&mut self, msg: Message) -> anyhow::Result<()> {
        let kind = msg.kind();
        if !server_accepts(self.phase).contains(&kind) {
            debug!("{:?} rejected in {:?}", kind, self.phase);
            return self
                .send(Message::error(format!(
                    "{:?} is not accepted while {:?}",
                    kind, self.phase
                )))
                .await;
        }
        match self.handle(msg).await {
            Ok(routes) => {
                for route in routes {
                    match route {
                        Route::Reply(msg) => self.send(msg).await?,
                        Route::Push { to, session, msg } => self.shared.push(&to, session, msg),
                    }
                }
                Ok(())
            }
            Err(e) => {
                debug!("{:?} from {:?} rejected: {}", kind, self.player, e);
                self.send(Message::error(e)).await
            }
        }
    }

    async fn handle(&mut self, msg: Message) -> Result<Vec<Route>, GameError> {
        match msg {
            Message::Login { username, password } => Ok(self.login(username, password)),
            Message::Register { username, password } => Ok(self.register(username, password)),
            Message::ReconnectToken { token } => {
                let player = self
                    .shared
                    .auth
                    .resolve(&token)
                    .ok_or(GameError::UnknownSession)?;
                self.reconnect(player).await
            }
            Message::StartNewGame { mode } => self.start_new_game(mode),
            Message::PlaceShips { fleet, difficulty } => {
                self.in_session(|session, seat| session.ready_with_layout(seat, &fleet, difficulty))
                    .await
            }
            Message::Shot { at } => {
                let shared = self.shared.clone();
                self.in_session(|session, seat| {
                    let mut events = session.shoot(seat, at)?;
                    if matches!(session.mode(), GameMode::Practice(_)) {
                        events.extend(session.play_computer_turns(&mut *shared.rng()));
                    }
                    Ok(events)
                })
                .await
            }
            Message::Resign => self.in_session(|session, seat| session.forfeit(seat)).await,
            Message::SaveGame => self.save_game().await,
            Message::ListSaves => {
                let player = self.signed_in()?;
                let saves = self.blocking(move |store| store.list_saves(&player)).await?;
                Ok(vec![Route::Reply(Message::GameList { saves })])
            }
            Message::ContinueGame { name } => self.continue_game(name).await,
            Message::DeleteSave { name } => self.delete_save(name).await,
            Message::ExitToLobby => Ok(self.exit_to_lobby().await),
            other => {
                warn!("no handler for {:?}", other.kind());
                Err(GameError::WrongPhase)
            }
        }
    }

    fn signed_in(&self) -> Result<PlayerId, GameError> {
        self.player.clone().ok_or(GameError::NotParticipant)
    }

    fn sign_in(&mut self, player: PlayerId) {
        if let Some(previous) = self.player.take() {
            if previous != player {
                self.release_outbox(&previous);
            }
        }
        self.shared
            .outboxes()
            .insert(player.clone(), self.outbox_tx.clone());
        info!("{} signed in", player);
        self.player = Some(player);
        self.phase = ConnPhase::Lobby;
    }

    fn login(&mut self, username: String, password: String) -> Vec<Route> {
        match self.shared.auth.login(&username, &password) {
            Ok(token) => {
                self.sign_in(username.clone());
                vec![
                    Route::Reply(Message::LoginSuccess {
                        username,
                        resuming: false,
                    }),
                    Route::Reply(Message::AuthToken { token }),
                ]
            }
            Err(e) => vec![Route::Reply(Message::LoginFail {
                reason: e.to_string(),
            })],
        }
    }

    fn register(&mut self, username: String, password: String) -> Vec<Route> {
        match self.shared.auth.register(&username, &password) {
            Ok(token) => {
                self.sign_in(username.clone());
                vec![
                    Route::Reply(Message::RegisterSuccess { username }),
                    Route::Reply(Message::AuthToken { token }),
                ]
            }
            Err(e) => vec![Route::Reply(Message::RegisterFail {
                reason: e.to_string(),
            })],
        }
    }

    /// Attach to the player's live session, if any. The snapshot is taken
    /// under the session lock so it never sees a half-applied action.
    async fn reconnect(&mut self, player: PlayerId) -> Result<Vec<Route>, GameError> {
        self.sign_in(player.clone());
        let snapshot = match self.shared.registry.session_for(&player) {
            Some(shared) => {
                let session = shared.lock().await;
                session.seat_of(&player).map(|seat| session.snapshot(seat))
            }
            None => None,
        };
        let mut routes = vec![Route::Reply(Message::LoginSuccess {
            username: player,
            resuming: snapshot.is_some(),
        })];
        if let Some(snapshot) = snapshot {
            routes.push(Route::Reply(Message::GameState(snapshot)));
        }
        Ok(routes)
    }

    fn start_new_game(&mut self, mode: GameMode) -> Result<Vec<Route>, GameError> {
        let player = self.signed_in()?;
        let registry = &self.shared.registry;
        registry.cancel_wait(&player);
        registry.detach(&player);

        match mode {
            GameMode::Practice(difficulty) => {
                let session = GameSession::practice(
                    SessionRegistry::new_session_id(),
                    player.clone(),
                    difficulty,
                    &mut *self.shared.rng(),
                )?;
                let snapshot = session.snapshot(Seat::One);
                registry.insert(session);
                info!("{} started a {} practice game", player, difficulty);
                Ok(vec![Route::Reply(Message::GameState(snapshot))])
            }
            GameMode::Versus => match registry.enqueue_versus(&player) {
                Some(opponent) => {
                    let session =
                        GameSession::versus(SessionRegistry::new_session_id(), opponent.clone(), player.clone());
                    let id = session.id().to_string();
                    let theirs = session.snapshot(Seat::One);
                    let mine = session.snapshot(Seat::Two);
                    registry.insert(session);
                    info!("paired {} with {} in {}", opponent, player, id);
                    Ok(vec![
                        Route::Push {
                            to: opponent,
                            session: id,
                            msg: Message::GameState(theirs),
                        },
                        Route::Reply(Message::GameState(mine)),
                    ])
                }
                None => Ok(vec![Route::Reply(Message::WaitingForOpponent)]),
            },
        }
    }

    fn bound_session(&self) -> Result<(PlayerId, SharedSession), GameError> {
        let player = self.signed_in()?;
        let shared = self
            .shared
            .registry
            .session_for(&player)
            .ok_or(GameError::UnknownSession)?;
        Ok((player, shared))
    }

    /// Run one rules action under the session lock and fan its events out.
    async fn in_session<F>(&self, action: F) -> Result<Vec<Route>, GameError>
    where
        F: FnOnce(&mut GameSession, Seat) -> Result<Vec<SessionEvent>, GameError>,
    {
        let (player, shared) = self.bound_session()?;
        let mut session = shared.lock().await;
        let seat = session.seat_of(&player).ok_or(GameError::NotParticipant)?;
        let events = action(&mut *session, seat)?;

        let mut per_seat = announce(&session, &events);
        if events.is_empty() {
            per_seat.push((seat, Message::GameState(session.snapshot(seat))));
        }
        Ok(route_all(&session, &player, per_seat))
    }

    /// Run a store call on the blocking pool.
    async fn blocking<R, F>(&self, call: F) -> Result<R, GameError>
    where
        R: Send + 'static,
        F: FnOnce(&dyn SaveStore) -> Result<R, GameError> + Send + 'static,
    {
        let store = self.shared.store.clone();
        tokio::task::spawn_blocking(move || call(store.as_ref()))
            .await
            .map_err(|e| GameError::PersistenceFailure(e.to_string()))?
    }

    /// Persist the bound session and leave it. The saver goes back to the
    /// lobby; a versus opponent is told and keeps the live game.
    async fn save_game(&self) -> Result<Vec<Route>, GameError> {
        let (player, shared) = self.bound_session()?;
        let frozen = {
            let session = shared.lock().await;
            if session.phase() == Phase::Placing {
                return Err(GameError::WrongPhase);
            }
            session.clone()
        };
        let id = frozen.id().to_string();
        let others: Vec<PlayerId> = frozen
            .players()
            .filter(|p| *p != player)
            .map(str::to_string)
            .collect();
        let saved = SavedGame::new(player.clone(), frozen);
        let name = self.blocking(move |store| store.save(&saved)).await?;
        info!("saved game {}", name);

        self.shared.registry.detach(&player);
        let mut routes: Vec<Route> = others
            .into_iter()
            .map(|to| Route::Push {
                to,
                session: id.clone(),
                msg: Message::error(format!("{} saved the game and left", player)),
            })
            .collect();
        routes.push(Route::Reply(Message::SaveAck { name }));
        Ok(routes)
    }

    async fn continue_game(&mut self, name: String) -> Result<Vec<Route>, GameError> {
        let player = self.signed_in()?;
        let saved = self.blocking(move |store| store.load(&name)).await?;
        if saved.player != player || saved.session.seat_of(&player).is_none() {
            return Err(GameError::UnknownSession);
        }
        self.shared.registry.cancel_wait(&player);
        let shared = self.shared.registry.resume(saved.session, &player);
        let session = shared.lock().await;
        let seat = session.seat_of(&player).ok_or(GameError::NotParticipant)?;
        Ok(vec![Route::Reply(Message::GameState(session.snapshot(seat)))])
    }

    async fn delete_save(&self, name: String) -> Result<Vec<Route>, GameError> {
        let player = self.signed_in()?;
        let saves = self
            .blocking(move |store| {
                let owned = store.list_saves(&player)?;
                if !owned.iter().any(|info| info.name == name) {
                    return Err(GameError::UnknownSession);
                }
                store.delete(&name)?;
                store.list_saves(&player)
            })
            .await?;
        Ok(vec![Route::Reply(Message::GameList { saves })])
    }

    /// Back to the lobby. A finished game is let go; a running one stays
    /// bound so a reconnect can pick it up again.
    async fn exit_to_lobby(&mut self) -> Vec<Route> {
        if let Some(player) = self.player.clone() {
            self.shared.registry.cancel_wait(&player);
            if let Some(shared) = self.shared.registry.session_for(&player) {
                let finished = matches!(shared.lock().await.phase(), Phase::Finished { .. });
                if finished {
                    self.shared.registry.detach(&player);
                }
            }
        }
        self.phase = ConnPhase::Lobby;
        Vec::new()
    }

    fn release_outbox(&self, player: &str) {
        let mut outboxes = self.shared.outboxes();
        if outboxes
            .get(player)
            .map(|tx| tx.same_channel(&self.outbox_tx))
            .unwrap_or(false)
        {
            outboxes.remove(player);
        }
    }

    /// Connection loss leaves every session untouched and resumable.
    fn disconnect(&mut self) {
        if let Some(player) = self.player.take() {
            self.shared.registry.cancel_wait(&player);
            self.release_outbox(&player);
            debug!("{} went offline", player);
        }
    }
}

/// Translate session events into per-seat messages. A shooter's
/// `ShotResult` is held back until the consequences of that shot (sinking,
/// game over) have been announced.
fn announce(session: &GameSession, events: &[SessionEvent]) -> Vec<(Seat, Message)> {
    let mut out = Vec::new();
    let mut held: Option<(Seat, Message)> = None;
    for event in events {
        match event {
            SessionEvent::GameStarted { .. } => {
                for seat in [Seat::One, Seat::Two] {
                    out.push((seat, Message::GameStart(session.snapshot(seat))));
                }
            }
            SessionEvent::ShotResolved { shooter, at, hit } => {
                out.extend(held.take());
                held = Some((*shooter, Message::ShotResult { at: *at, hit: *hit }));
                out.push((
                    shooter.opponent(),
                    Message::OpponentShot { at: *at, hit: *hit },
                ));
            }
            SessionEvent::ShipSunk { owner, cells } => {
                for seat in [Seat::One, Seat::Two] {
                    out.push((
                        seat,
                        Message::ShipSunk {
                            cells: cells.clone(),
                            own_fleet: seat == *owner,
                        },
                    ));
                }
            }
            SessionEvent::TurnPassed { .. } => out.extend(held.take()),
            SessionEvent::GameOver { winner, reason } => {
                for seat in [Seat::One, Seat::Two] {
                    out.push((
                        seat,
                        Message::GameOver {
                            winner: session.occupant(*winner).name().to_string(),
                            you_won: seat == *winner,
                            forfeit: *reason == FinishReason::Forfeit,
                        },
                    ));
                }
            }
        }
    }
    out.extend(held);
    out
}

/// Address per-seat messages: the acting player gets replies, the other human
/// gets pushes, a computer seat gets nothing.
fn route_all(session: &GameSession, actor: &str, per_seat: Vec<(Seat, Message)>) -> Vec<Route> {
    per_seat
        .into_iter()
        .filter_map(|(seat, msg)| match session.occupant(seat) {
            Occupant::Human(id) if id == actor => Some(Route::Reply(msg)),
            Occupant::Human(id) => Some(Route::Push {
                to: id.clone(),
                session: session.id().to_string(),
                msg,
            }),
            Occupant::Computer(_) => None,
        })
        .collect()
}
