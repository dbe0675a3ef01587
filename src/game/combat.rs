//! Combat Resolution
//!
//! Melee hit detection, knockback, projectile spawning and flight, fence
//! hazard damage, and the shared damage/death path.
//!
//! Nothing here evaluates the win condition. Callers run
//! `lifecycle::evaluate_win` once after each resolution pass so that deaths
//! in the same pass resolve together.

use crate::core::vec2::Vec2;
use crate::game::config::ArenaConfig;
use crate::game::events::GameEvent;
use crate::game::item;
use crate::game::state::{ArenaState, Equipment, PlayerId, round_health};

/// Where a point of damage came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageSource {
    /// Bare-handed peck
    Peck,
    /// Melee weapon swing
    Melee,
    /// Projectile
    Ranged,
    /// Electrified fence
    Hazard,
}

/// A single application of damage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Damage {
    /// Player taking the damage
    pub target: PlayerId,
    /// Player credited, `None` for environmental damage
    pub attacker: Option<PlayerId>,
    /// Health removed (before rounding)
    pub amount: f32,
    /// Critical hit
    pub crit: bool,
    /// Source class
    pub source: DamageSource,
}

/// What an accepted attack did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttackOutcome {
    /// Melee swing; lists every player hit
    Melee {
        /// Targets in range
        hits: Vec<PlayerId>,
    },
    /// Ranged shot launched
    Projectile(u32),
}

/// Outcome of applying damage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageResult {
    /// Health after the hit
    pub health: f32,
    /// The hit killed the target
    pub killed: bool,
}

// =============================================================================
// ATTACKS
// =============================================================================

/// Resolve an attack by a living attacker.
///
/// A ranged-weapon holder launches a projectile; everyone else swings at every
/// living player in range.
pub fn resolve_attack(
    state: &mut ArenaState,
    config: &ArenaConfig,
    attacker_id: PlayerId,
    aim: Option<Vec2>,
) -> Option<AttackOutcome> {
    let (origin, equipment, facing) = state
        .player(&attacker_id)
        .filter(|p| p.alive)
        .map(|p| (p.position, p.equipment, p.facing_vector()))?;

    if equipment == Equipment::RangedWeapon {
        let direction = aim
            .filter(|a| a.is_finite())
            .and_then(|a| (a - origin).try_normalize())
            .unwrap_or(facing);
        let id = state.add_projectile(attacker_id, origin, direction.scale(config.projectile_speed));
        return Some(AttackOutcome::Projectile(id));
    }

    let (range, base_damage, knockback, source) = if equipment == Equipment::MeleeWeapon {
        (config.melee_range, config.melee_damage, config.melee_knockback, DamageSource::Melee)
    } else {
        (config.unarmed_range, config.peck_damage, config.unarmed_knockback, DamageSource::Peck)
    };

    let targets: Vec<(PlayerId, Vec2)> = state
        .list_players()
        .filter(|p| p.id != attacker_id && p.alive)
        .filter(|p| p.position.distance(origin) < range)
        .map(|p| (p.id, p.position))
        .collect();

    // One roll per swing; every target shares it
    let crit = state.rng().next_bool(config.crit_chance);
    let amount = if crit { base_damage * config.crit_multiplier } else { base_damage };

    let mut hits = Vec::with_capacity(targets.len());
    for (target, target_pos) in targets {
        let result = apply_damage(state, Damage {
            target,
            attacker: Some(attacker_id),
            amount,
            crit,
            source,
        }, true);

        if result.is_some_and(|r| !r.killed) {
            // Coincident players are pushed along +x
            let push = (target_pos - origin).try_normalize().unwrap_or(Vec2::RIGHT).scale(knockback);
            state.mutate_player(&target, |p| p.position = config.clamp_position(p.position + push));
        }
        hits.push(target);
    }

    Some(AttackOutcome::Melee { hits })
}

/// Advance every projectile one step and resolve the first hit of each.
///
/// Projectiles leaving the arena are removed. Returns the players hit.
pub fn advance_projectiles(state: &mut ArenaState, config: &ArenaConfig) -> Vec<PlayerId> {
    let mut hit_players = Vec::new();

    for projectile_id in state.projectile_ids() {
        let Some((owner, position)) = state.mutate_projectile(projectile_id, |p| {
            p.position = p.position + p.velocity;
            (p.owner, p.position)
        }) else {
            continue;
        };

        if !config.contains(position) {
            state.remove_projectile(projectile_id);
            continue;
        }

        let target = state
            .list_players()
            .filter(|p| p.alive && p.id != owner)
            .find(|p| p.position.distance(position) < config.projectile_hit_radius)
            .map(|p| p.id);

        if let Some(target) = target {
            state.remove_projectile(projectile_id);
            apply_damage(state, Damage {
                target,
                attacker: Some(owner),
                amount: config.ranged_damage,
                crit: false,
                source: DamageSource::Ranged,
            }, true);
            hit_players.push(target);
        }
    }

    hit_players
}

/// Damage every living player touching the fence band.
///
/// Hit feedback is throttled; the damage always applies.
pub fn apply_hazard(state: &mut ArenaState, config: &ArenaConfig) -> Vec<PlayerId> {
    let touching: Vec<PlayerId> = state
        .list_players()
        .filter(|p| p.alive && config.in_hazard_band(p.position))
        .map(|p| p.id)
        .collect();

    for &target in &touching {
        let notify = state.rng().next_bool(config.hazard_feedback_chance);
        apply_damage(state, Damage {
            target,
            attacker: None,
            amount: config.hazard_damage,
            crit: false,
            source: DamageSource::Hazard,
        }, notify);
    }

    touching
}

// =============================================================================
// DAMAGE AND DEATH
// =============================================================================

/// Reduce a living player's health, killing them at zero.
///
/// Returns `None` if the target is unknown or already dead.
pub fn apply_damage(
    state: &mut ArenaState,
    damage: Damage,
    notify: bool,
) -> Option<DamageResult> {
    let health = state.mutate_player(&damage.target, |p| {
        debug_assert!(p.alive, "damage applied to a dead player");
        if !p.alive {
            return None;
        }
        p.health = round_health(p.health - damage.amount);
        Some(p.health)
    })??;

    if notify {
        state.push_event(GameEvent::hit(
            state.tick(),
            damage.target,
            damage.attacker,
            damage.amount,
            damage.crit,
            damage.source == DamageSource::Ranged,
            damage.source == DamageSource::Hazard,
        ));
    }

    let killed = health <= 0.0;
    if killed {
        kill_player(state, damage.target, damage.attacker);
    }

    Some(DamageResult { health, killed })
}

/// Mark a player dead and drop their weapon where they fell.
pub fn kill_player(state: &mut ArenaState, target: PlayerId, killer: Option<PlayerId>) {
    let Some((equipment, position)) = state.mutate_player(&target, |p| {
        if !p.alive {
            return None;
        }
        p.alive = false;
        p.health = 0.0;
        p.speed_boost_ticks = 0;
        let held = std::mem::take(&mut p.equipment);
        Some((held, p.position))
    }).flatten() else {
        return;
    };

    item::drop_weapon(state, equipment, position);
    state.push_event(GameEvent::death(state.tick(), target, killer));
}
