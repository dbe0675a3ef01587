//! Simulation Tick
//!
//! One fixed-rate step of the arena. Projectiles, fence hazard and pickups
//! only advance while the battle is active; a snapshot is produced every tick
//! regardless of phase.

use crate::game::combat;
use crate::game::config::ArenaConfig;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::item;
use crate::game::lifecycle;
use crate::game::state::{ArenaState, MatchPhase, ProjectileSnapshot, WorldSnapshot};

/// Result of a tick.
#[derive(Debug)]
pub struct TickResult {
    /// Tick number just simulated
    pub tick: u64,
    /// Events generated this tick (plus any left over from intents)
    pub events: Vec<GameEvent>,
    /// State after the tick, for broadcast
    pub snapshot: WorldSnapshot,
}

/// Run one simulation tick.
///
/// Order while Active:
/// 1. spawn timers
/// 2. projectile flight and hits, then win check
/// 3. fence hazard, then win check
/// 4. item pickups
/// 5. projectile positions broadcast
pub fn tick(state: &mut ArenaState, config: &ArenaConfig) -> TickResult {
    let tick = state.advance_tick();

    state.mutate_all_players(|p| p.speed_boost_ticks = p.speed_boost_ticks.saturating_sub(1));

    match state.phase() {
        MatchPhase::Waiting => {}
        MatchPhase::Active => step_battle(state, config),
        MatchPhase::RoundEnding { .. } => lifecycle::advance_round_end(state, config),
    }

    TickResult {
        tick,
        events: state.take_events(),
        snapshot: state.snapshot(),
    }
}

fn step_battle(state: &mut ArenaState, config: &ArenaConfig) {
    item::advance_spawn_timers(state, config);

    combat::advance_projectiles(state, config);
    if lifecycle::evaluate_win(state, config) {
        return;
    }

    combat::apply_hazard(state, config);
    if lifecycle::evaluate_win(state, config) {
        return;
    }

    item::process_pickups(state, config);
    broadcast_projectiles(state);
}

/// Send projectile positions while any are in flight, plus one empty update
/// after the last one disappears.
fn broadcast_projectiles(state: &mut ArenaState) {
    let projectiles: Vec<ProjectileSnapshot> = state.list_projectiles().map(ProjectileSnapshot::from).collect();
    let visible = !projectiles.is_empty();
    if visible || state.projectiles_visible {
        state.push_event(GameEvent::broadcast(
            state.tick(),
            GameEventData::ProjectileUpdate { projectiles },
        ));
    }
    state.projectiles_visible = visible;
}
