//! Core simulation primitives.
//!
//! Math, seeded randomness and state digests shared by the game modules.
//! Nothing in here touches the clock or the network.

pub mod vec2;
pub mod rng;
pub mod hash;

// Re-export core types
pub use vec2::Vec2;
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash};
