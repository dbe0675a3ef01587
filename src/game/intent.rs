//! Intent Processing
//!
//! Validates one player command and applies it to the arena. Rejections are
//! returned as `IntentError` and leave the state untouched; the session logs
//! them and only the cases the client can act on produce a notification.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::vec2::Vec2;
use crate::game::combat::{self, AttackOutcome};
use crate::game::config::ArenaConfig;
use crate::game::events::{ActionKind, GameEvent, GameEventData};
use crate::game::lifecycle;
use crate::game::item;
use crate::game::state::{ArenaState, MatchPhase, MatchPhaseKind, Player, PlayerId};

/// Name given to players who join without one.
pub const DEFAULT_NAME: &str = "Anonymous Rooster";

/// Color given to players who join without one.
pub const DEFAULT_COLOR: &str = "white";

/// Taunt phrases, indexed by the client.
pub const TAUNTS: [&str; 4] = ["COCK-A-DOODLE-DOO!", "FIGHT ME!", "WEAK!", "CRAZY ROOSTER!"];

/// Phrase used for unknown taunt indices.
pub const DEFAULT_TAUNT: &str = "...";

/// Cardinal movement direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// -Y
    Up,
    /// +Y
    Down,
    /// -X
    Left,
    /// +X
    Right,
}

impl Direction {
    /// Unit vector for this direction.
    pub fn vector(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::UP,
            Direction::Down => Vec2::DOWN,
            Direction::Left => Vec2::LEFT,
            Direction::Right => Vec2::RIGHT,
        }
    }

    /// New facing, if this direction changes it.
    pub fn facing(self) -> Option<i8> {
        match self {
            Direction::Left => Some(-1),
            Direction::Right => Some(1),
            Direction::Up | Direction::Down => None,
        }
    }
}

/// A single action request from one connection.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    /// Enter the arena
    Join {
        /// Requested display name
        name: String,
        /// Requested display color
        color: String,
    },
    /// Step one unit of speed in a cardinal direction
    Move(Direction),
    /// Burst away from the nearest opponent
    Dash,
    /// Swing, peck or shoot
    Attack {
        /// Target point for ranged shots
        aim: Option<Vec2>,
    },
    /// Cosmetic phrase
    Taunt(usize),
    /// Leave the arena
    Leave,
}

/// Why an intent was rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    /// Identity has not joined
    #[error("unknown player")]
    UnknownPlayer,

    /// Identity already joined
    #[error("player already joined")]
    AlreadyJoined,

    /// Player cap reached
    #[error("arena full ({capacity} players)")]
    ArenaFull {
        /// Configured cap
        capacity: usize,
    },

    /// Dead players wait for the round reset
    #[error("player is dead")]
    PlayerDead,

    /// Not allowed in the current phase
    #[error("not allowed while {0}")]
    PhaseForbids(MatchPhaseKind),

    /// Cooldown not elapsed
    #[error("on cooldown for {remaining_ticks} more ticks")]
    OnCooldown {
        /// Ticks left
        remaining_ticks: u64,
    },
}

/// Apply one intent from a connection.
pub fn apply_intent(
    state: &mut ArenaState,
    config: &ArenaConfig,
    player_id: PlayerId,
    intent: Intent,
) -> Result<(), IntentError> {
    match intent {
        Intent::Join { name, color } => join(state, config, player_id, &name, &color),
        Intent::Move(direction) => move_player(state, config, player_id, direction),
        Intent::Dash => dash(state, config, player_id),
        Intent::Attack { aim } => attack(state, config, player_id, aim).map(|_| ()),
        Intent::Taunt(index) => taunt(state, player_id, index),
        Intent::Leave => leave(state, config, player_id),
    }
}

/// Trim and bound a display name.
pub fn sanitize_name(name: &str, max_len: usize) -> String {
    let trimmed: String = name.trim().chars().take(max_len).collect();
    let trimmed = trimmed.trim_end();
    if trimmed.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Look up a living player.
fn living_player<'a>(state: &'a ArenaState, player_id: &PlayerId) -> Result<&'a Player, IntentError> {
    let player = state.player(player_id).ok_or(IntentError::UnknownPlayer)?;
    if !player.alive {
        return Err(IntentError::PlayerDead);
    }
    Ok(player)
}

/// Movement, dashes and attacks are frozen while a round is ending.
fn check_phase_allows_action(state: &ArenaState) -> Result<(), IntentError> {
    match state.phase() {
        MatchPhase::RoundEnding { .. } => Err(IntentError::PhaseForbids(MatchPhaseKind::RoundEnding)),
        MatchPhase::Waiting | MatchPhase::Active => Ok(()),
    }
}

// =============================================================================
// INTENTS
// =============================================================================

/// Register a connection as a player at a random spawn.
pub fn join(
    state: &mut ArenaState,
    config: &ArenaConfig,
    player_id: PlayerId,
    name: &str,
    color: &str,
) -> Result<(), IntentError> {
    if state.player(&player_id).is_some() {
        return Err(IntentError::AlreadyJoined);
    }

    let tick = state.tick();
    if state.player_count() >= config.max_players {
        state.push_event(GameEvent::to_player(tick, player_id, GameEventData::ArenaFull {
            capacity: config.max_players,
        }));
        return Err(IntentError::ArenaFull { capacity: config.max_players });
    }

    let name = sanitize_name(name, config.name_max_len);
    let color = match color.trim() {
        "" => DEFAULT_COLOR.to_string(),
        c => c.to_string(),
    };
    let position = state.random_spawn(config);
    let join_seq = state.next_join_seq();
    state.upsert_player(Player::new(player_id, name.clone(), color, position, join_seq));

    state.push_event(GameEvent::to_player(tick, player_id, GameEventData::LoginSuccess {
        player_id,
        width: config.width,
        height: config.height,
    }));
    let existing: Vec<GameEvent> = state
        .list_items()
        .map(|item| GameEvent::to_player(tick, player_id, GameEventData::ItemSpawned {
            item_id: item.id,
            kind: item.kind,
            position: item.position,
        }))
        .collect();
    for event in existing {
        state.push_event(event);
    }
    state.push_event(GameEvent::broadcast(tick, GameEventData::PlayerJoined { player_id, name }));

    lifecycle::on_player_joined(state);
    lifecycle::broadcast_leaderboard(state, config);
    Ok(())
}

/// Step in a cardinal direction and clamp to the arena.
pub fn move_player(
    state: &mut ArenaState,
    config: &ArenaConfig,
    player_id: PlayerId,
    direction: Direction,
) -> Result<(), IntentError> {
    let speed = living_player(state, &player_id)?.speed(config);
    check_phase_allows_action(state)?;

    state.mutate_player(&player_id, |p| {
        p.position = config.clamp_position(p.position + direction.vector().scale(speed));
        if let Some(facing) = direction.facing() {
            p.facing = facing;
        }
    });
    Ok(())
}

/// Dash away from the nearest living opponent, or backwards if alone.
///
/// A dash on cooldown tells the caller how long is left.
pub fn dash(state: &mut ArenaState, config: &ArenaConfig, player_id: PlayerId) -> Result<(), IntentError> {
    let player = living_player(state, &player_id)?;
    let (position, facing, last_dash) = (player.position, player.facing_vector(), player.last_dash_tick);
    check_phase_allows_action(state)?;

    let tick = state.tick();
    let remaining = Player::cooldown_remaining(last_dash, config.dash_cooldown_ticks, tick);
    if remaining > 0 {
        state.push_event(GameEvent::to_player(tick, player_id, GameEventData::CooldownNotice {
            player_id,
            remaining_ms: config.ticks_to_ms(remaining),
        }));
        return Err(IntentError::OnCooldown { remaining_ticks: remaining });
    }

    let nearest = state
        .list_players()
        .filter(|p| p.id != player_id && p.alive)
        .map(|p| (p.position.distance(position), p.position))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, opponent)| opponent);

    let direction = nearest
        .and_then(|opponent| (position - opponent).try_normalize())
        .unwrap_or(-facing);

    state.mutate_player(&player_id, |p| {
        p.position = config.clamp_position(p.position + direction.scale(config.dash_distance));
        p.last_dash_tick = Some(tick);
    });

    state.push_event(GameEvent::broadcast(tick, GameEventData::ActionPerformed {
        player_id,
        action: ActionKind::Dash,
    }));
    let snapshot = state.snapshot();
    state.push_event(GameEvent::broadcast(tick, GameEventData::StateSnapshot(snapshot)));
    Ok(())
}

/// Attack with whatever the player holds.
///
/// Before the battle starts the swing animates but deals no damage, in which
/// case `Ok(None)` is returned.
pub fn attack(
    state: &mut ArenaState,
    config: &ArenaConfig,
    player_id: PlayerId,
    aim: Option<Vec2>,
) -> Result<Option<AttackOutcome>, IntentError> {
    let last_attack = living_player(state, &player_id)?.last_attack_tick;
    check_phase_allows_action(state)?;

    let tick = state.tick();
    let remaining = Player::cooldown_remaining(last_attack, config.attack_cooldown_ticks, tick);
    if remaining > 0 {
        return Err(IntentError::OnCooldown { remaining_ticks: remaining });
    }

    state.mutate_player(&player_id, |p| p.last_attack_tick = Some(tick));
    state.push_event(GameEvent::broadcast(tick, GameEventData::ActionPerformed {
        player_id,
        action: ActionKind::Attack,
    }));

    if state.phase() == MatchPhase::Waiting {
        return Ok(None);
    }

    let outcome = combat::resolve_attack(state, config, player_id, aim);
    lifecycle::evaluate_win(state, config);
    Ok(outcome)
}

/// Broadcast a taunt phrase. Unknown indices get the default phrase.
pub fn taunt(state: &mut ArenaState, player_id: PlayerId, index: usize) -> Result<(), IntentError> {
    living_player(state, &player_id)?;

    let text = TAUNTS.get(index).copied().unwrap_or(DEFAULT_TAUNT).to_string();
    state.push_event(GameEvent::broadcast(state.tick(), GameEventData::CosmeticMessage {
        player_id,
        text,
    }));
    Ok(())
}

/// Remove a player, dropping their weapon where they stood.
pub fn leave(state: &mut ArenaState, config: &ArenaConfig, player_id: PlayerId) -> Result<(), IntentError> {
    let player = state.remove_player(&player_id).ok_or(IntentError::UnknownPlayer)?;

    item::drop_weapon(state, player.equipment, player.position);
    state.push_event(GameEvent::broadcast(state.tick(), GameEventData::PlayerLeft { player_id }));

    lifecycle::on_player_left(state, config);
    lifecycle::broadcast_leaderboard(state, config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Equipment, ItemKind, MAX_HEALTH};
    use proptest::prelude::*;

    fn pid(byte: u8) -> PlayerId {
        PlayerId::new([byte; 16])
    }

    fn joined(count: u8) -> (ArenaState, ArenaConfig) {
        let config = ArenaConfig { crit_chance: 0.0, ..Default::default() };
        let mut state = ArenaState::new(2024);
        for i in 1..=count {
            join(&mut state, &config, pid(i), &format!("P{i}"), "red").unwrap();
        }
        state.take_events();
        (state, config)
    }

    fn place(state: &mut ArenaState, byte: u8, x: f32, y: f32) {
        state.mutate_player(&pid(byte), |p| p.position = Vec2::new(x, y));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  Rooster  ", 15), "Rooster");
        assert_eq!(sanitize_name("", 15), DEFAULT_NAME);
        assert_eq!(sanitize_name("   ", 15), DEFAULT_NAME);
        assert_eq!(sanitize_name("ABCDEFGHIJKLMNOPQRST", 15), "ABCDEFGHIJKLMNO");
        assert_eq!(sanitize_name("Galo Galo Galo Galo", 10), "Galo Galo");
    }

    #[test]
    fn test_join_events() {
        let (mut state, config) = joined(0);
        let item_id = state.add_item(ItemKind::Healing, Vec2::new(100.0, 100.0));

        join(&mut state, &config, pid(1), "Alpha", "").unwrap();
        let events = state.take_events();

        assert!(matches!(events[0].data, GameEventData::LoginSuccess { width, .. } if width == 800.0));
        assert!(!events[0].is_for(&pid(2)));
        assert!(events.iter().any(|e| matches!(
            e.data,
            GameEventData::ItemSpawned { item_id: id, .. } if id == item_id
        ) && !e.is_for(&pid(2))));
        assert!(events.iter().any(|e| matches!(e.data, GameEventData::Leaderboard { .. })));
        assert_eq!(state.player(&pid(1)).unwrap().color, DEFAULT_COLOR);
    }

    #[test]
    fn test_join_twice_rejected() {
        let (mut state, config) = joined(1);
        assert_eq!(join(&mut state, &config, pid(1), "Again", "red"), Err(IntentError::AlreadyJoined));
    }

    #[test]
    fn test_arena_full() {
        let (mut state, _) = joined(0);
        let config = ArenaConfig { max_players: 2, ..Default::default() };
        join(&mut state, &config, pid(1), "A", "red").unwrap();
        join(&mut state, &config, pid(2), "B", "red").unwrap();
        state.take_events();

        let result = join(&mut state, &config, pid(3), "C", "red");
        assert_eq!(result, Err(IntentError::ArenaFull { capacity: 2 }));
        assert!(state.player(&pid(3)).is_none());

        let events = state.take_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_for(&pid(3)) && !events[0].is_for(&pid(1)));
    }

    #[test]
    fn test_move_and_facing() {
        let (mut state, config) = joined(1);
        place(&mut state, 1, 300.0, 300.0);

        move_player(&mut state, &config, pid(1), Direction::Left).unwrap();
        move_player(&mut state, &config, pid(1), Direction::Up).unwrap();

        let player = state.player(&pid(1)).unwrap();
        assert_eq!(player.position, Vec2::new(293.0, 293.0));
        assert_eq!(player.facing, -1);
    }

    #[test]
    fn test_move_clamps_to_bounds() {
        let (mut state, config) = joined(1);
        place(&mut state, 1, 736.0, 2.0);

        move_player(&mut state, &config, pid(1), Direction::Right).unwrap();
        move_player(&mut state, &config, pid(1), Direction::Up).unwrap();

        assert_eq!(state.player(&pid(1)).unwrap().position, Vec2::new(740.0, 0.0));
    }

    #[test]
    fn test_boosted_move() {
        let (mut state, config) = joined(1);
        place(&mut state, 1, 300.0, 300.0);
        state.mutate_player(&pid(1), |p| p.speed_boost_ticks = 10);

        move_player(&mut state, &config, pid(1), Direction::Down).unwrap();
        assert_eq!(state.player(&pid(1)).unwrap().position, Vec2::new(300.0, 312.0));
    }

    #[test]
    fn test_dead_player_rejected() {
        let (mut state, config) = joined(2);
        place(&mut state, 2, 300.0, 300.0);
        state.mutate_player(&pid(2), |p| {
            p.alive = false;
            p.health = 0.0;
        });

        assert_eq!(move_player(&mut state, &config, pid(2), Direction::Up), Err(IntentError::PlayerDead));
        assert_eq!(dash(&mut state, &config, pid(2)), Err(IntentError::PlayerDead));
        assert_eq!(attack(&mut state, &config, pid(2), None), Err(IntentError::PlayerDead));
        assert_eq!(taunt(&mut state, pid(2), 0), Err(IntentError::PlayerDead));
        assert_eq!(state.player(&pid(2)).unwrap().position, Vec2::new(300.0, 300.0));
    }

    #[test]
    fn test_unknown_player_rejected() {
        let (mut state, config) = joined(0);
        assert_eq!(
            apply_intent(&mut state, &config, pid(9), Intent::Move(Direction::Up)),
            Err(IntentError::UnknownPlayer)
        );
        assert_eq!(apply_intent(&mut state, &config, pid(9), Intent::Leave), Err(IntentError::UnknownPlayer));
    }

    #[test]
    fn test_dash_away_from_opponent() {
        let (mut state, config) = joined(2);
        place(&mut state, 1, 300.0, 300.0);
        place(&mut state, 2, 350.0, 300.0);

        dash(&mut state, &config, pid(1)).unwrap();

        assert_eq!(state.player(&pid(1)).unwrap().position, Vec2::new(200.0, 300.0));
        assert!(state.take_events().iter().any(|e| matches!(e.data, GameEventData::StateSnapshot(_))));
    }

    #[test]
    fn test_dash_alone_goes_backwards() {
        let (mut state, config) = joined(1);
        place(&mut state, 1, 300.0, 300.0);

        dash(&mut state, &config, pid(1)).unwrap();
        assert_eq!(state.player(&pid(1)).unwrap().position, Vec2::new(200.0, 300.0));
    }

    #[test]
    fn test_dash_cooldown_notice() {
        let (mut state, config) = joined(1);
        place(&mut state, 1, 300.0, 300.0);
        dash(&mut state, &config, pid(1)).unwrap();
        state.take_events();

        let result = dash(&mut state, &config, pid(1));
        assert_eq!(result, Err(IntentError::OnCooldown { remaining_ticks: 60 }));

        let events = state.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].data, GameEventData::CooldownNotice { remaining_ms: 1000, .. }));
        assert!(events[0].is_for(&pid(1)));
        assert_eq!(state.player(&pid(1)).unwrap().position, Vec2::new(200.0, 300.0));
    }

    #[test]
    fn test_attack_in_waiting_animates_only() {
        let (mut state, config) = joined(1);
        assert_eq!(state.phase(), MatchPhase::Waiting);

        assert_eq!(attack(&mut state, &config, pid(1), None), Ok(None));
        assert!(state.take_events().iter().any(|e| matches!(
            e.data,
            GameEventData::ActionPerformed { action: ActionKind::Attack, .. }
        )));
    }

    #[test]
    fn test_attack_cooldown() {
        let (mut state, config) = joined(2);
        place(&mut state, 1, 300.0, 300.0);
        place(&mut state, 2, 350.0, 300.0);

        attack(&mut state, &config, pid(1), None).unwrap();
        assert_eq!(
            attack(&mut state, &config, pid(1), None),
            Err(IntentError::OnCooldown { remaining_ticks: 24 })
        );
        assert!((state.player(&pid(2)).unwrap().health - 99.2).abs() < 1e-4);
    }

    #[test]
    fn test_round_ending_freezes_actions_but_not_taunts() {
        let (mut state, config) = joined(2);
        state.set_phase(MatchPhase::RoundEnding { ticks_remaining: 10, winner: None });

        let forbidden = Err(IntentError::PhaseForbids(MatchPhaseKind::RoundEnding));
        assert_eq!(move_player(&mut state, &config, pid(1), Direction::Up), forbidden);
        assert_eq!(dash(&mut state, &config, pid(1)), forbidden);
        assert_eq!(attack(&mut state, &config, pid(1), None).map(|_| ()), forbidden);
        assert_eq!(taunt(&mut state, pid(1), 1), Ok(()));
    }

    #[test]
    fn test_taunt_phrases() {
        let (mut state, _) = joined(1);
        taunt(&mut state, pid(1), 1).unwrap();
        taunt(&mut state, pid(1), 99).unwrap();

        let texts: Vec<String> = state
            .take_events()
            .into_iter()
            .filter_map(|e| match e.data {
                GameEventData::CosmeticMessage { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["FIGHT ME!".to_string(), DEFAULT_TAUNT.to_string()]);
    }

    #[test]
    fn test_leave_drops_weapon_and_ends_battle() {
        let (mut state, config) = joined(3);
        assert_eq!(state.phase(), MatchPhase::Active);
        place(&mut state, 3, 100.0, 100.0);
        state.mutate_player(&pid(3), |p| p.equipment = Equipment::MeleeWeapon);

        leave(&mut state, &config, pid(3)).unwrap();
        assert_eq!(state.item_count(ItemKind::MeleeWeapon), 1);
        let dropped: Vec<Vec2> = state.list_items().map(|item| item.position).collect();
        assert_eq!(dropped, vec![Vec2::new(100.0, 100.0)]);
        assert_eq!(state.phase(), MatchPhase::Active);

        leave(&mut state, &config, pid(2)).unwrap();
        assert_eq!(state.phase(), MatchPhase::Waiting);
        assert_eq!(state.list_items().count(), 0);
        assert!(!state.take_events().iter().any(|e| matches!(e.data, GameEventData::RoundWinner { .. })));
    }

    #[test]
    fn test_leave_resolves_round_when_one_survivor_remains() {
        let (mut state, config) = joined(3);
        state.mutate_player(&pid(2), |p| {
            p.alive = false;
            p.health = 0.0;
        });

        leave(&mut state, &config, pid(3)).unwrap();

        assert_eq!(state.phase().kind(), MatchPhaseKind::RoundEnding);
        assert_eq!(state.player(&pid(1)).unwrap().wins, 1);
        assert_eq!(state.player(&pid(2)).unwrap().health, 0.0);
        assert!(state.player(&pid(1)).unwrap().health == MAX_HEALTH);
    }

    fn direction_strategy() -> impl Strategy<Value = Direction> {
        prop_oneof![
            Just(Direction::Up),
            Just(Direction::Down),
            Just(Direction::Left),
            Just(Direction::Right),
        ]
    }

    proptest! {
        #[test]
        fn prop_moves_stay_in_bounds(
            moves in prop::collection::vec((direction_strategy(), any::<bool>()), 1..300)
        ) {
            let (mut state, config) = joined(1);
            let max = config.max_position();

            for (direction, boosted) in moves {
                state.mutate_player(&pid(1), |p| p.speed_boost_ticks = if boosted { 1 } else { 0 });
                move_player(&mut state, &config, pid(1), direction).unwrap();

                let pos = state.player(&pid(1)).unwrap().position;
                prop_assert!(pos.x >= 0.0 && pos.x <= max.x);
                prop_assert!(pos.y >= 0.0 && pos.y <= max.y);
            }
        }
    }
}
