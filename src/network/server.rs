//! WebSocket Game Server
//!
//! Async WebSocket transport for the arena. Each connection gets a fresh
//! identity, a bounded outbound queue and two tasks: a writer that drains the
//! queue into the socket, and a reader that parses frames into intents and
//! forwards them to the arena session.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, Stream, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::game::config::{env_parse, ArenaConfig, ConfigError};
use crate::game::state::PlayerId;
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::network::session::{ArenaSession, SessionError, SessionHandle};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Tick rate for game simulation (Hz).
    pub tick_rate: u32,
    /// Outbound queue depth per connection.
    pub outbound_buffer: usize,
    /// Session command queue depth.
    pub command_buffer: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            tick_rate: 60,
            outbound_buffer: 256,
            command_buffer: 4096,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults with `PORT`, `HOST` and `TICK_RATE` overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(port) = env_parse::<u16>("PORT")? {
            config.bind_addr.set_port(port);
        }
        if let Some(host) = env_parse("HOST")? {
            config.bind_addr.set_ip(host);
        }
        if let Some(tick_rate) = env_parse("TICK_RATE")? {
            config.tick_rate = tick_rate;
        }

        Ok(config)
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection limit reached.
    #[error("Connection limit reached")]
    ConnectionLimitReached,

    /// Session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Occupied connection slot; released on drop.
struct ConnectionSlot {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Handle to the arena session.
    session: SessionHandle,
    /// Session waiting to be started by `serve`.
    pending_session: std::sync::Mutex<Option<ArenaSession>>,
    /// Open connections.
    active: Arc<AtomicUsize>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server around a fresh arena.
    pub fn new(config: ServerConfig, mut arena: ArenaConfig, seed: u64) -> Self {
        arena.tick_rate = config.tick_rate;
        let (session, handle) = ArenaSession::new(arena, seed, config.command_buffer);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            session: handle,
            pending_session: std::sync::Mutex::new(Some(session)),
            active: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Bind the configured address and run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server v{} listening on {}", self.config.version, self.config.bind_addr);
        self.serve(listener).await
    }

    /// Accept connections on an already-bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        let session_task = self.take_session().map(|session| tokio::spawn(session.run()));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let slot = match self.reserve_slot() {
                                Ok(slot) => slot,
                                Err(e) => {
                                    warn!("Rejecting {}: {}", addr, e);
                                    continue;
                                }
                            };

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr, slot);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Some(task) = session_task {
            task.abort();
        }

        Ok(())
    }

    fn take_session(&self) -> Option<ArenaSession> {
        match self.pending_session.lock() {
            Ok(mut pending) => pending.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn reserve_slot(&self) -> Result<ConnectionSlot, GameServerError> {
        let previous = self.active.fetch_add(1, Ordering::SeqCst);
        let slot = ConnectionSlot { active: self.active.clone() };
        if previous >= self.config.max_connections {
            return Err(GameServerError::ConnectionLimitReached);
        }
        Ok(slot)
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr, slot: ConnectionSlot) {
        let session = self.session.clone();
        let outbound_buffer = self.config.outbound_buffer;
        let shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let player_id = PlayerId::new_random();
            match run_connection(stream, player_id, session, outbound_buffer, shutdown_rx).await {
                Ok(()) => debug!("Client {} ({}) disconnected", addr, player_id.short_hex()),
                Err(e) => warn!("Client {} ({}) dropped: {}", addr, player_id.short_hex(), e),
            }
            drop(slot);
        });
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Pump one connection until it closes, then disconnect it from the session.
async fn run_connection(
    stream: TcpStream,
    player_id: PlayerId,
    session: SessionHandle,
    outbound_buffer: usize,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), GameServerError> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(outbound_buffer.max(1));

    session.connect(player_id, msg_tx.clone()).await?;

    let sender_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            let text = match msg.to_json() {
                Ok(t) => t,
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let result = read_frames(&mut ws_receiver, player_id, &session, &msg_tx, &mut shutdown_rx).await;

    // Queued behind every intent this connection already submitted.
    let disconnected = session.disconnect(player_id).await;
    sender_task.abort();

    result?;
    disconnected.map_err(GameServerError::from)
}

async fn read_frames<S>(
    ws_receiver: &mut S,
    player_id: PlayerId,
    session: &SessionHandle,
    msg_tx: &mpsc::Sender<ServerMessage>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> Result<(), GameServerError>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match ClientMessage::from_json(&text) {
                            Ok(client_msg) => session.submit(player_id, client_msg.into_intent()).await?,
                            Err(e) => {
                                debug!("Invalid message from {}: {}", player_id.short_hex(), e);
                                let _ = msg_tx.try_send(ServerMessage::invalid_frame(e));
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(_)) => {}
                }
            }
            _ = shutdown_rx.recv() => return Ok(()),
        }
    }
}
