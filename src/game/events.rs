//! Game Events
//!
//! Closed set of notifications produced by the simulation. The session routes
//! each event to its recipients; the simulation itself never touches the network.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::state::{
    ItemKind, LeaderboardEntry, MatchPhaseKind, PlayerId, ProjectileSnapshot, WorldSnapshot,
};

/// Who an event is delivered to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every connection
    All,
    /// A single connection
    Player(PlayerId),
}

/// Visible action for client animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Attack swing or shot
    Attack,
    /// Dash
    Dash,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Join accepted
    LoginSuccess {
        player_id: PlayerId,
        width: f32,
        height: f32,
    },

    /// A player entered the arena
    PlayerJoined {
        player_id: PlayerId,
        name: String,
    },

    /// A player left the arena
    PlayerLeft {
        player_id: PlayerId,
    },

    /// Item placed on the ground
    ItemSpawned {
        item_id: u32,
        kind: ItemKind,
        position: Vec2,
    },

    /// Item taken off the ground
    ItemPicked {
        item_id: u32,
        player_id: PlayerId,
    },

    /// Every ground item removed
    ItemsCleared,

    /// Projectile positions after a tick
    ProjectileUpdate {
        projectiles: Vec<ProjectileSnapshot>,
    },

    /// Attack or dash accepted
    ActionPerformed {
        player_id: PlayerId,
        action: ActionKind,
    },

    /// Damage applied
    Hit {
        target_id: PlayerId,
        attacker_id: Option<PlayerId>,
        damage: f32,
        crit: bool,
        ranged: bool,
        hazard: bool,
    },

    /// Player died
    Death {
        target_id: PlayerId,
        killer_id: Option<PlayerId>,
    },

    /// Round decided; no winner means a draw
    RoundWinner {
        winner_id: Option<PlayerId>,
        winner_name: Option<String>,
    },

    /// New round started
    RoundReset,

    /// Match phase changed
    PhaseChanged {
        from: MatchPhaseKind,
        to: MatchPhaseKind,
    },

    /// Ranked players by wins
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },

    /// Dash rejected while cooling down
    CooldownNotice {
        player_id: PlayerId,
        remaining_ms: u64,
    },

    /// Taunt bubble
    CosmeticMessage {
        player_id: PlayerId,
        text: String,
    },

    /// Join rejected, arena at capacity
    ArenaFull {
        capacity: usize,
    },

    /// Out-of-cadence snapshot (dash, round reset)
    StateSnapshot(WorldSnapshot),
}

/// A game event with timing and routing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Delivery target
    pub recipient: Recipient,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create an event for every connection.
    pub fn broadcast(tick: u64, data: GameEventData) -> Self {
        Self { tick, recipient: Recipient::All, data }
    }

    /// Create an event for one connection.
    pub fn to_player(tick: u64, player_id: PlayerId, data: GameEventData) -> Self {
        Self { tick, recipient: Recipient::Player(player_id), data }
    }

    /// Create hit event.
    pub fn hit(
        tick: u64,
        target_id: PlayerId,
        attacker_id: Option<PlayerId>,
        damage: f32,
        crit: bool,
        ranged: bool,
        hazard: bool,
    ) -> Self {
        Self::broadcast(
            tick,
            GameEventData::Hit { target_id, attacker_id, damage, crit, ranged, hazard },
        )
    }

    /// Create death event.
    pub fn death(tick: u64, target_id: PlayerId, killer_id: Option<PlayerId>) -> Self {
        Self::broadcast(tick, GameEventData::Death { target_id, killer_id })
    }

    /// Create item spawned event.
    pub fn item_spawned(tick: u64, item_id: u32, kind: ItemKind, position: Vec2) -> Self {
        Self::broadcast(tick, GameEventData::ItemSpawned { item_id, kind, position })
    }

    /// Create phase changed event.
    pub fn phase_changed(tick: u64, from: MatchPhaseKind, to: MatchPhaseKind) -> Self {
        Self::broadcast(tick, GameEventData::PhaseChanged { from, to })
    }

    /// Create leaderboard event.
    pub fn leaderboard(tick: u64, entries: Vec<LeaderboardEntry>) -> Self {
        Self::broadcast(tick, GameEventData::Leaderboard { entries })
    }

    /// Check whether a connection should receive this event.
    pub fn is_for(&self, player_id: &PlayerId) -> bool {
        match self.recipient {
            Recipient::All => true,
            Recipient::Player(id) => id == *player_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_routing() {
        let a = PlayerId::new([1; 16]);
        let b = PlayerId::new([2; 16]);

        let private = GameEvent::to_player(3, a, GameEventData::CooldownNotice {
            player_id: a,
            remaining_ms: 500,
        });
        assert!(private.is_for(&a));
        assert!(!private.is_for(&b));

        let public = GameEvent::death(3, a, Some(b));
        assert!(public.is_for(&a));
        assert!(public.is_for(&b));
    }

    #[test]
    fn test_hit_constructor() {
        let target = PlayerId::new([1; 16]);
        let event = GameEvent::hit(9, target, None, 0.5, false, false, true);

        assert_eq!(event.tick, 9);
        assert_eq!(event.recipient, Recipient::All);
        assert!(matches!(
            event.data,
            GameEventData::Hit { hazard: true, attacker_id: None, .. }
        ));
    }
}
