//! Game Logic Module
//!
//! The arena simulation. No clock, no network, no global state: time is
//! counted in ticks and randomness comes from the arena's seeded RNG.
//!
//! ## Module Structure
//!
//! - `config`: Tunables and environment overrides
//! - `state`: World State Store (players, items, projectiles, phase)
//! - `events`: Outbound notifications
//! - `intent`: Player command validation and application
//! - `combat`: Melee, projectiles, fence hazard, death path
//! - `item`: Spawn timers and pickups
//! - `lifecycle`: Phase transitions, win evaluation, round reset
//! - `tick`: Fixed-rate simulation step

pub mod config;
pub mod state;
pub mod events;
pub mod intent;
pub mod combat;
pub mod item;
pub mod lifecycle;
pub mod tick;

// Re-export key types
pub use config::{ArenaConfig, ConfigError};
pub use state::{ArenaState, Player, PlayerId, MatchPhase, MatchPhaseKind, WorldSnapshot};
pub use intent::{apply_intent, Direction, Intent, IntentError};
pub use tick::{tick, TickResult};
pub use events::{GameEvent, GameEventData, Recipient};
