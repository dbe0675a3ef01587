//! Network Layer
//!
//! WebSocket transport and the arena session actor.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod protocol;
pub mod session;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage};
pub use session::{ArenaSession, SessionCommand, SessionError, SessionHandle};
pub use server::{GameServer, ServerConfig, GameServerError};
