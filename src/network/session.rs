//! Arena Session
//!
//! The single serialized execution context for the arena. Connection tasks
//! never touch `ArenaState` directly: they send `SessionCommand`s through a
//! `SessionHandle`, and one task drains that queue interleaved with the tick
//! interval. Every mutation (intent or timer driven) therefore runs to
//! completion before the next one starts.
//!
//! Events produced by an intent are flushed right after the intent is
//! applied; everything else becomes visible with the next tick's snapshot.

use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::config::ArenaConfig;
use crate::game::events::{GameEvent, GameEventData, Recipient};
use crate::game::intent::{self, Intent};
use crate::game::state::{ArenaState, PlayerId};
use crate::game::tick::tick;
use crate::network::protocol::ServerMessage;

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session task has stopped.
    #[error("Session closed")]
    Closed,

    /// No connection registered under this identity.
    #[error("Unknown connection")]
    UnknownConnection,
}

/// Work item for the session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Register a connection and its outbound queue.
    Connect {
        /// Connection identity.
        player_id: PlayerId,
        /// Outbound queue.
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Apply an intent on behalf of a connection.
    Intent {
        /// Connection identity.
        player_id: PlayerId,
        /// Requested action.
        intent: Intent,
    },
    /// Connection closed; leave the arena and forget the connection.
    Disconnect {
        /// Connection identity.
        player_id: PlayerId,
    },
}

/// Cloneable handle used by connection tasks to reach the session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Register a connection.
    pub async fn connect(
        &self,
        player_id: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), SessionError> {
        self.send(SessionCommand::Connect { player_id, sender }).await
    }

    /// Queue an intent.
    pub async fn submit(&self, player_id: PlayerId, intent: Intent) -> Result<(), SessionError> {
        self.send(SessionCommand::Intent { player_id, intent }).await
    }

    /// Queue a disconnect behind any intents already submitted.
    pub async fn disconnect(&self, player_id: PlayerId) -> Result<(), SessionError> {
        self.send(SessionCommand::Disconnect { player_id }).await
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).await.map_err(|_| SessionError::Closed)
    }
}

/// Owner of the arena state and of every connection's outbound queue.
pub struct ArenaSession {
    /// Authoritative state.
    state: ArenaState,
    /// Simulation tunables.
    config: ArenaConfig,
    /// Outbound queue per connection (joined or not).
    connections: BTreeMap<PlayerId, mpsc::Sender<ServerMessage>>,
    /// Inbound command queue.
    commands: mpsc::Receiver<SessionCommand>,
}

impl ArenaSession {
    /// Create a session and the handle that feeds it.
    pub fn new(config: ArenaConfig, seed: u64, command_buffer: usize) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(command_buffer.max(1));
        let session = Self {
            state: ArenaState::new(seed),
            config,
            connections: BTreeMap::new(),
            commands: rx,
        };
        (session, SessionHandle { commands: tx })
    }

    /// Current arena state.
    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    /// Arena configuration.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Drive the session until every handle is dropped.
    pub async fn run(mut self) {
        let period = Duration::from_secs(1) / self.config.tick_rate.max(1);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Arena session started (seed {}, {} Hz, {}x{})",
            self.state.rng_seed(),
            self.config.tick_rate,
            self.config.width,
            self.config.height
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => {
                            if let Err(e) = self.handle_command(command) {
                                debug!("Command dropped: {}", e);
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    self.step();
                }
            }
        }

        info!("Arena session stopped at tick {}", self.state.tick());
    }

    /// Apply one command and flush the events it produced.
    pub fn handle_command(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::Connect { player_id, sender } => {
                debug!("Connection {} registered", player_id.short_hex());
                self.connections.insert(player_id, sender);
            }
            SessionCommand::Intent { player_id, intent } => {
                if !self.connections.contains_key(&player_id) {
                    return Err(SessionError::UnknownConnection);
                }
                if let Err(e) = intent::apply_intent(&mut self.state, &self.config, player_id, intent) {
                    debug!("Intent from {} rejected: {}", player_id.short_hex(), e);
                }
            }
            SessionCommand::Disconnect { player_id } => {
                if self.connections.remove(&player_id).is_none() {
                    return Err(SessionError::UnknownConnection);
                }
                if self.state.player(&player_id).is_some() {
                    // Cannot fail: the player exists.
                    let _ = intent::leave(&mut self.state, &self.config, player_id);
                }
                debug!("Connection {} closed", player_id.short_hex());
            }
        }

        let events = self.state.take_events();
        self.flush_events(events);
        Ok(())
    }

    /// Advance the simulation one tick and broadcast the result.
    pub fn step(&mut self) -> u64 {
        let result = tick(&mut self.state, &self.config);
        self.flush_events(result.events);
        self.broadcast(ServerMessage::StateSnapshot(result.snapshot));
        result.tick
    }

    fn flush_events(&self, events: Vec<GameEvent>) {
        for event in events {
            log_event(&self.state, &event);
            let message = ServerMessage::from(&event.data);
            match event.recipient {
                Recipient::All => self.broadcast(message),
                Recipient::Player(id) => {
                    if let Some(sender) = self.connections.get(&id) {
                        deliver(&id, sender, message);
                    }
                }
            }
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        for (id, sender) in &self.connections {
            deliver(id, sender, message.clone());
        }
    }
}

/// Queue a message without waiting; a full queue drops it.
fn deliver(id: &PlayerId, sender: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
    match sender.try_send(message) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!("Outbound queue full for {}, message dropped", id.short_hex());
        }
        Err(TrySendError::Closed(_)) => {
            debug!("Outbound queue closed for {}", id.short_hex());
        }
    }
}

fn log_event(state: &ArenaState, event: &GameEvent) {
    match &event.data {
        GameEventData::PlayerJoined { player_id, name } => {
            info!("Player {} joined as {:?} ({} in arena)", player_id.short_hex(), name, state.player_count());
        }
        GameEventData::PlayerLeft { player_id } => {
            info!("Player {} left ({} in arena)", player_id.short_hex(), state.player_count());
        }
        GameEventData::PhaseChanged { from, to } => {
            info!("Phase {} -> {} at tick {}", from, to, event.tick);
        }
        GameEventData::RoundWinner { winner_name: Some(name), .. } => {
            info!("Round won by {:?} at tick {}", name, event.tick);
        }
        GameEventData::RoundWinner { winner_name: None, .. } => {
            info!("Round ended in a draw at tick {}", event.tick);
        }
        GameEventData::ItemSpawned { item_id, kind, position } => {
            debug!("Item {} ({:?}) spawned at ({:.0}, {:.0})", item_id, kind, position.x, position.y);
        }
        GameEventData::ArenaFull { capacity } => {
            info!("Join rejected, arena full ({} players)", capacity);
        }
        _ => {}
    }
}
