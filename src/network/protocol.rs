//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON text frames.
//!
//! Client messages are flat objects tagged by `type`:
//! `{"type":"move","direction":"left"}`.
//! Server messages carry their payload under `data` so that payload fields
//! (an item's `type`, for instance) never collide with the tag:
//! `{"type":"item_spawn","data":{"id":3,"type":"healing","x":120.0,"y":80.0}}`.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::events::{ActionKind, GameEventData};
use crate::game::intent::{Direction, Intent};
use crate::game::state::{
    ItemKind, LeaderboardEntry, MatchPhaseKind, PlayerId, ProjectileSnapshot, WorldSnapshot,
};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter the arena.
    Join {
        /// Display name (sanitized server-side).
        #[serde(default)]
        name: String,
        /// Display color.
        #[serde(default)]
        color: String,
    },

    /// Step in a cardinal direction.
    Move {
        /// Direction of travel.
        direction: Direction,
    },

    /// Dash away from the nearest opponent.
    Dash,

    /// Attack; the aim point is only used by ranged weapons.
    Attack {
        /// Aim X coordinate.
        #[serde(default)]
        aim_x: Option<f32>,
        /// Aim Y coordinate.
        #[serde(default)]
        aim_y: Option<f32>,
    },

    /// Show a taunt bubble.
    Taunt {
        /// Index into the phrase table.
        index: usize,
    },

    /// Leave the arena (the connection stays open).
    Leave,
}

impl ClientMessage {
    /// Convert to a simulation intent.
    ///
    /// A partial or non-finite aim point is treated as no aim.
    pub fn into_intent(self) -> Intent {
        match self {
            ClientMessage::Join { name, color } => Intent::Join { name, color },
            ClientMessage::Move { direction } => Intent::Move(direction),
            ClientMessage::Dash => Intent::Dash,
            ClientMessage::Attack { aim_x, aim_y } => {
                let aim = match (aim_x, aim_y) {
                    (Some(x), Some(y)) => Some(Vec2::new(x, y)).filter(|aim| aim.is_finite()),
                    _ => None,
                };
                Intent::Attack { aim }
            }
            ClientMessage::Taunt { index } => Intent::Taunt(index),
            ClientMessage::Leave => Intent::Leave,
        }
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Ground item as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    /// Item ID.
    pub id: u32,
    /// Item type.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join accepted (to sender).
    LoginSuccess {
        /// Assigned identity.
        id: PlayerId,
        /// Arena width.
        width: f32,
        /// Arena height.
        height: f32,
    },

    /// Full world state.
    StateSnapshot(WorldSnapshot),

    /// Item appeared on the ground.
    ItemSpawn(ItemView),

    /// Item removed by a pickup.
    ItemPicked {
        /// Item ID.
        id: u32,
        /// Who picked it up.
        player_id: PlayerId,
    },

    /// Every ground item removed.
    ItemsCleared,

    /// Projectile positions.
    ProjectileUpdate {
        /// In-flight projectiles (empty once the last one is gone).
        projectiles: Vec<ProjectileSnapshot>,
    },

    /// Animation cue for an accepted attack or dash.
    Action {
        /// Acting player.
        id: PlayerId,
        /// What they did.
        kind: ActionKind,
    },

    /// Damage applied.
    Hit {
        /// Damaged player.
        #[serde(rename = "targetId")]
        target_id: PlayerId,
        /// Attacker, absent for the fence.
        #[serde(rename = "attackerId")]
        attacker_id: Option<PlayerId>,
        /// Damage dealt.
        #[serde(rename = "dmg")]
        damage: f32,
        /// Critical hit.
        crit: bool,
        /// Projectile hit.
        ranged: bool,
        /// Fence hit.
        hazard: bool,
    },

    /// Player died.
    Death {
        /// Dead player.
        #[serde(rename = "targetId")]
        target_id: PlayerId,
        /// Killer, absent for the fence.
        #[serde(rename = "killerId")]
        killer_id: Option<PlayerId>,
    },

    /// Round decided; both fields are null on a draw.
    RoundWinner {
        /// Winner identity.
        id: Option<PlayerId>,
        /// Winner display name.
        name: Option<String>,
    },

    /// New round started.
    RoundReset,

    /// Match phase changed.
    PhaseChanged {
        /// New phase.
        phase: MatchPhaseKind,
        /// Previous phase.
        previous: MatchPhaseKind,
    },

    /// Player entered the arena.
    PlayerJoined {
        /// Identity.
        id: PlayerId,
        /// Display name.
        name: String,
    },

    /// Player left the arena.
    PlayerLeft {
        /// Identity.
        id: PlayerId,
    },

    /// Top players by wins.
    Leaderboard {
        /// Ranked rows.
        entries: Vec<LeaderboardEntry>,
    },

    /// Dash still cooling down (to sender).
    CooldownNotice {
        /// Milliseconds left.
        #[serde(rename = "remaining")]
        remaining_ms: u64,
    },

    /// Taunt bubble.
    CosmeticMessage {
        /// Speaker.
        id: PlayerId,
        /// Phrase.
        text: String,
    },

    /// Join rejected because the arena is full (to sender).
    ArenaFullError {
        /// Player cap.
        capacity: usize,
    },

    /// Malformed client frame (to sender).
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerMessage {
    /// Error reply for a frame that could not be parsed.
    pub fn invalid_frame(reason: impl std::fmt::Display) -> Self {
        ServerMessage::Error { message: format!("invalid message: {}", reason) }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl From<&GameEventData> for ServerMessage {
    fn from(data: &GameEventData) -> Self {
        match data {
            GameEventData::LoginSuccess { player_id, width, height } => ServerMessage::LoginSuccess {
                id: *player_id,
                width: *width,
                height: *height,
            },
            GameEventData::PlayerJoined { player_id, name } => ServerMessage::PlayerJoined {
                id: *player_id,
                name: name.clone(),
            },
            GameEventData::PlayerLeft { player_id } => ServerMessage::PlayerLeft { id: *player_id },
            GameEventData::ItemSpawned { item_id, kind, position } => ServerMessage::ItemSpawn(ItemView {
                id: *item_id,
                kind: *kind,
                x: position.x,
                y: position.y,
            }),
            GameEventData::ItemPicked { item_id, player_id } => ServerMessage::ItemPicked {
                id: *item_id,
                player_id: *player_id,
            },
            GameEventData::ItemsCleared => ServerMessage::ItemsCleared,
            GameEventData::ProjectileUpdate { projectiles } => ServerMessage::ProjectileUpdate {
                projectiles: projectiles.clone(),
            },
            GameEventData::ActionPerformed { player_id, action } => ServerMessage::Action {
                id: *player_id,
                kind: *action,
            },
            GameEventData::Hit { target_id, attacker_id, damage, crit, ranged, hazard } => ServerMessage::Hit {
                target_id: *target_id,
                attacker_id: *attacker_id,
                damage: *damage,
                crit: *crit,
                ranged: *ranged,
                hazard: *hazard,
            },
            GameEventData::Death { target_id, killer_id } => ServerMessage::Death {
                target_id: *target_id,
                killer_id: *killer_id,
            },
            GameEventData::RoundWinner { winner_id, winner_name } => ServerMessage::RoundWinner {
                id: *winner_id,
                name: winner_name.clone(),
            },
            GameEventData::RoundReset => ServerMessage::RoundReset,
            GameEventData::PhaseChanged { from, to } => ServerMessage::PhaseChanged {
                phase: *to,
                previous: *from,
            },
            GameEventData::Leaderboard { entries } => ServerMessage::Leaderboard { entries: entries.clone() },
            GameEventData::CooldownNotice { remaining_ms, .. } => ServerMessage::CooldownNotice {
                remaining_ms: *remaining_ms,
            },
            GameEventData::CosmeticMessage { player_id, text } => ServerMessage::CosmeticMessage {
                id: *player_id,
                text: text.clone(),
            },
            GameEventData::ArenaFull { capacity } => ServerMessage::ArenaFullError { capacity: *capacity },
            GameEventData::StateSnapshot(snapshot) => ServerMessage::StateSnapshot(snapshot.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_parse_client_messages() {
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"move","direction":"left"}"#).unwrap(),
            ClientMessage::Move { direction: Direction::Left }
        );
        assert_eq!(ClientMessage::from_json(r#"{"type":"dash"}"#).unwrap(), ClientMessage::Dash);
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"taunt","index":2}"#).unwrap(),
            ClientMessage::Taunt { index: 2 }
        );
        assert_eq!(ClientMessage::from_json(r#"{"type":"leave"}"#).unwrap(), ClientMessage::Leave);
    }

    #[test]
    fn test_join_fields_optional() {
        let msg = ClientMessage::from_json(r#"{"type":"join"}"#).unwrap();
        assert_eq!(msg.into_intent(), Intent::Join { name: String::new(), color: String::new() });
    }

    #[test]
    fn test_attack_aim() {
        let aimed = ClientMessage::from_json(r#"{"type":"attack","aim_x":300.5,"aim_y":120}"#).unwrap();
        assert_eq!(aimed.into_intent(), Intent::Attack { aim: Some(Vec2::new(300.5, 120.0)) });

        let bare = ClientMessage::from_json(r#"{"type":"attack"}"#).unwrap();
        assert_eq!(bare.into_intent(), Intent::Attack { aim: None });

        let partial = ClientMessage::from_json(r#"{"type":"attack","aim_x":10}"#).unwrap();
        assert_eq!(partial.into_intent(), Intent::Attack { aim: None });
    }

    #[test]
    fn test_reject_malformed() {
        assert!(ClientMessage::from_json("not json").is_err());
        assert!(ClientMessage::from_json(r#"{"type":"fly"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"move","direction":"north"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"taunt"}"#).is_err());
    }

    #[test]
    fn test_item_spawn_wire_shape() {
        let data = GameEventData::ItemSpawned {
            item_id: 7,
            kind: ItemKind::Healing,
            position: Vec2::new(400.0, 300.0),
        };
        let value: Value = serde_json::from_str(&ServerMessage::from(&data).to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "item_spawn",
                "data": { "id": 7, "type": "healing", "x": 400.0, "y": 300.0 }
            })
        );
    }

    #[test]
    fn test_hit_and_cooldown_field_names() {
        let target = PlayerId::new([0x11; 16]);
        let hit = GameEventData::Hit {
            target_id: target,
            attacker_id: None,
            damage: 0.5,
            crit: false,
            ranged: false,
            hazard: true,
        };
        let value: Value = serde_json::from_str(&ServerMessage::from(&hit).to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "hit");
        assert_eq!(value["data"]["targetId"], target.to_uuid_string());
        assert_eq!(value["data"]["dmg"], 0.5);
        assert!(value["data"]["attackerId"].is_null());

        let notice = GameEventData::CooldownNotice { player_id: target, remaining_ms: 350 };
        let value: Value = serde_json::from_str(&ServerMessage::from(&notice).to_json().unwrap()).unwrap();
        assert_eq!(value, json!({ "type": "cooldown_notice", "data": { "remaining": 350 } }));
    }

    #[test]
    fn test_draw_round_winner_is_null() {
        let data = GameEventData::RoundWinner { winner_id: None, winner_name: None };
        let value: Value = serde_json::from_str(&ServerMessage::from(&data).to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "round_winner");
        assert!(value["data"]["name"].is_null());
    }

    #[test]
    fn test_unit_messages_have_no_payload() {
        let value: Value = serde_json::from_str(&ServerMessage::RoundReset.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({ "type": "round_reset" }));
    }

    #[test]
    fn test_player_id_as_uuid_string() {
        let id = PlayerId::new([0xab; 16]);
        let msg = ServerMessage::PlayerLeft { id };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(value["data"]["id"], "abababab-abab-abab-abab-abababababab");
        assert_eq!(ServerMessage::from_json(&msg.to_json().unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_invalid_frame_message() {
        let msg = ServerMessage::invalid_frame("expected value");
        assert_eq!(msg, ServerMessage::Error { message: "invalid message: expected value".to_string() });
    }
}
