//! # Rooster Arena Server
//!
//! Authoritative simulation core for a real-time rooster brawler, plus the
//! WebSocket transport that feeds it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   ROOSTER ARENA SERVER                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── vec2.rs     - 2D vector math                            │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - Snapshot hashing                          │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── config.rs   - Arena tunables                            │
//! │  ├── state.rs    - World state store and snapshots           │
//! │  ├── events.rs   - Outbound notifications                    │
//! │  ├── intent.rs   - Player intent processor                   │
//! │  ├── combat.rs   - Attacks, projectiles, fence hazard        │
//! │  ├── item.rs     - Item spawning and pickups                 │
//! │  ├── lifecycle.rs- Match phases and round reset              │
//! │  └── tick.rs     - Fixed-rate simulation step                │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  └── session.rs  - Serialized arena session                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The `core/` and `game/` modules never read the clock or touch the network:
//! - Time is counted in ticks
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - All randomness from the arena's seeded Xorshift128+
//!
//! Given the same seed and the same intent sequence, the simulation produces
//! the same snapshots, down to the snapshot hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::vec2::Vec2;
pub use core::rng::DeterministicRng;
pub use game::config::ArenaConfig;
pub use game::state::{ArenaState, PlayerId, WorldSnapshot};
pub use game::intent::{apply_intent, Intent};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
