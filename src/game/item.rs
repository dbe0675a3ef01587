//! Item Spawning and Pickup
//!
//! Per-kind spawn timers with live-count caps, proximity pickup, and weapon
//! drops when a holder dies or leaves.
//!
//! A player already holding a weapon of an item's kind does not pick it up;
//! the item stays on the ground for someone else.

use crate::core::vec2::Vec2;
use crate::game::config::ArenaConfig;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::state::{ArenaState, Equipment, ItemKind, MatchPhase, PlayerId, round_health, MAX_HEALTH};

/// Advance every spawn timer by one tick, spawning where a timer fires.
///
/// Only runs while the battle is active. Returns the IDs of spawned items.
pub fn advance_spawn_timers(state: &mut ArenaState, config: &ArenaConfig) -> Vec<u32> {
    let mut spawned = Vec::new();
    if state.phase() != MatchPhase::Active {
        return spawned;
    }

    for kind in ItemKind::ALL {
        let spawn = config.spawn_config(kind);
        let elapsed = state.spawn_timers.elapsed_mut(kind);
        *elapsed += 1;
        if *elapsed < spawn.interval_ticks {
            continue;
        }
        *elapsed = 0;

        if state.item_count(kind) < spawn.max_live {
            spawned.push(spawn_item(state, config, kind));
        }
    }

    spawned
}

/// Spawn one item of a kind at a random in-bounds position.
pub fn spawn_item(state: &mut ArenaState, config: &ArenaConfig, kind: ItemKind) -> u32 {
    let margin = Vec2::new(config.item_margin, config.item_margin);
    let max = Vec2::new(config.width, config.height) - margin;
    let position = state.rng().random_point(margin, max);
    place_item(state, kind, position)
}

/// Put an item on the ground at a fixed position and announce it.
pub fn place_item(state: &mut ArenaState, kind: ItemKind, position: Vec2) -> u32 {
    let id = state.add_item(kind, position);
    state.push_event(GameEvent::item_spawned(state.tick(), id, kind, position));
    id
}

/// Turn held equipment back into a ground item.
pub fn drop_weapon(state: &mut ArenaState, equipment: Equipment, position: Vec2) -> Option<u32> {
    let kind = equipment.item_kind()?;
    Some(place_item(state, kind, position))
}

/// Give every living player the items within pickup range.
///
/// Players are visited in ID order, items in ID order, so contested items go
/// to the lowest player ID.
pub fn process_pickups(state: &mut ArenaState, config: &ArenaConfig) -> usize {
    let mut picked = 0;

    for player_id in state.player_ids() {
        let Some(position) = state.player(&player_id).filter(|p| p.alive).map(|p| p.position) else {
            continue;
        };

        let in_range: Vec<u32> = state
            .list_items()
            .filter(|item| item.position.distance(position) < config.pickup_radius)
            .map(|item| item.id)
            .collect();

        for item_id in in_range {
            if try_pickup(state, config, player_id, item_id) {
                picked += 1;
            }
        }
    }

    picked
}

/// Apply one item to one player. Returns whether the item was consumed.
pub fn try_pickup(state: &mut ArenaState, config: &ArenaConfig, player_id: PlayerId, item_id: u32) -> bool {
    let Some(kind) = state.item(item_id).map(|item| item.kind) else {
        return false;
    };

    let applied = state.mutate_player(&player_id, |player| {
        if !player.alive {
            return false;
        }
        match kind.equipment() {
            None => {
                player.health = round_health((player.health + config.heal_amount).min(MAX_HEALTH));
                player.speed_boost_ticks = config.speed_boost_ticks;
                true
            }
            Some(equipment) if player.equipment == equipment => false,
            Some(equipment) => {
                player.equipment = equipment;
                true
            }
        }
    });

    if applied != Some(true) {
        return false;
    }

    state.remove_item(item_id);
    state.push_event(GameEvent::broadcast(
        state.tick(),
        GameEventData::ItemPicked { item_id, player_id },
    ));
    if let Some(text) = kind.pickup_cheer() {
        state.push_event(GameEvent::broadcast(
            state.tick(),
            GameEventData::CosmeticMessage { player_id, text: text.to_string() },
        ));
    }
    true
}
