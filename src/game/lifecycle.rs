//! Match Lifecycle
//!
//! Phase transitions between Waiting, Active and RoundEnding, win evaluation,
//! and round resets.
//!
//! ```text
//! Waiting ──(2nd player joins)──▶ Active ──(≤1 alive)──▶ RoundEnding
//!    ▲                             ▲  │                       │
//!    │                             │  └──(<2 connected)──┐    │
//!    └─────────(<2 connected)──────┼─────────────────────┴────┤
//!                                  └────────(delay elapsed)───┘
//! ```

use crate::game::config::ArenaConfig;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::state::{ArenaState, MatchPhase, PlayerId};

/// Players needed for a battle.
pub const MIN_PLAYERS: usize = 2;

/// Change phase, announcing kind changes.
fn transition(state: &mut ArenaState, next: MatchPhase) {
    let from = state.phase().kind();
    state.set_phase(next);
    let to = next.kind();
    if from != to {
        state.push_event(GameEvent::phase_changed(state.tick(), from, to));
    }
}

/// Broadcast the current leaderboard.
pub fn broadcast_leaderboard(state: &mut ArenaState, config: &ArenaConfig) {
    let entries = state.leaderboard(config.leaderboard_size);
    state.push_event(GameEvent::leaderboard(state.tick(), entries));
}

/// Remove ground items and projectiles, restart spawn timers.
fn clear_ground(state: &mut ArenaState) {
    state.clear_items();
    state.clear_projectiles();
    state.spawn_timers.reset();
    state.push_event(GameEvent::broadcast(state.tick(), GameEventData::ItemsCleared));
}

/// Called after a join. Starts the battle once enough players are present.
pub fn on_player_joined(state: &mut ArenaState) {
    if state.phase() == MatchPhase::Waiting && state.player_count() >= MIN_PLAYERS {
        begin_battle(state);
    }
}

/// Waiting → Active. Dead players are revived in place.
pub fn begin_battle(state: &mut ArenaState) {
    state.mutate_all_players(|p| {
        if !p.alive {
            let position = p.position;
            p.reset_for_round(position);
        }
    });
    state.spawn_timers.reset();
    transition(state, MatchPhase::Active);
}

/// Any phase → Waiting. Clears the ground; players keep their state.
pub fn enter_waiting(state: &mut ArenaState) {
    clear_ground(state);
    transition(state, MatchPhase::Waiting);
}

/// Called after a leave has been applied to the store.
pub fn on_player_left(state: &mut ArenaState, config: &ArenaConfig) {
    if state.player_count() < MIN_PLAYERS {
        if state.phase() != MatchPhase::Waiting {
            enter_waiting(state);
        } else if state.player_count() == 0 && state.list_items().next().is_some() {
            clear_ground(state);
        }
        return;
    }

    evaluate_win(state, config);
}

/// Check whether the round is decided.
///
/// Fires only in Active with at least two connected players, so a round ends
/// at most once. A sole survivor wins and is credited; no survivors is a draw.
/// Returns `true` if the round ended.
pub fn evaluate_win(state: &mut ArenaState, config: &ArenaConfig) -> bool {
    if state.phase() != MatchPhase::Active || state.player_count() < MIN_PLAYERS {
        return false;
    }

    let survivors: Vec<PlayerId> = state.list_players().filter(|p| p.alive).map(|p| p.id).take(2).collect();
    if survivors.len() > 1 {
        return false;
    }
    let winner = survivors.first().copied();

    let tick = state.tick();
    match winner {
        Some(winner_id) => {
            let name = state.mutate_player(&winner_id, |p| {
                p.wins += 1;
                p.name.clone()
            });
            state.push_event(GameEvent::broadcast(tick, GameEventData::RoundWinner {
                winner_id: Some(winner_id),
                winner_name: name,
            }));
            transition(state, MatchPhase::RoundEnding {
                ticks_remaining: config.round_end_ticks,
                winner: Some(winner_id),
            });
            broadcast_leaderboard(state, config);
        }
        None => {
            state.push_event(GameEvent::broadcast(tick, GameEventData::RoundWinner {
                winner_id: None,
                winner_name: None,
            }));
            transition(state, MatchPhase::RoundEnding {
                ticks_remaining: config.draw_end_ticks,
                winner: None,
            });
        }
    }

    true
}

/// Count down the round-end delay; reset when it elapses.
pub fn advance_round_end(state: &mut ArenaState, config: &ArenaConfig) {
    let MatchPhase::RoundEnding { ticks_remaining, winner } = state.phase() else {
        return;
    };

    if state.player_count() < MIN_PLAYERS {
        enter_waiting(state);
    } else if ticks_remaining <= 1 {
        reset_round(state, config);
    } else {
        state.set_phase(MatchPhase::RoundEnding { ticks_remaining: ticks_remaining - 1, winner });
    }
}

/// Start a fresh round.
///
/// Every player is revived at full health, unarmed, at a new random spawn.
/// Items and projectiles are cleared and the spawn timers restart. Falls back
/// to Waiting when fewer than two players are connected.
pub fn reset_round(state: &mut ArenaState, config: &ArenaConfig) {
    if state.player_count() < MIN_PLAYERS {
        enter_waiting(state);
        return;
    }

    for id in state.player_ids() {
        let position = state.random_spawn(config);
        state.mutate_player(&id, |p| p.reset_for_round(position));
    }

    clear_ground(state);
    transition(state, MatchPhase::Active);
    state.push_event(GameEvent::broadcast(state.tick(), GameEventData::RoundReset));
    let snapshot = state.snapshot();
    state.push_event(GameEvent::broadcast(state.tick(), GameEventData::StateSnapshot(snapshot)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;
    use crate::game::state::{Equipment, ItemKind, MatchPhaseKind, Player, MAX_HEALTH};

    fn pid(byte: u8) -> PlayerId {
        PlayerId::new([byte; 16])
    }

    fn arena(count: u8) -> ArenaState {
        let mut state = ArenaState::new(5);
        for i in 1..=count {
            let seq = state.next_join_seq();
            state.upsert_player(Player::new(pid(i), format!("P{i}"), "white".into(), Vec2::new(200.0, 200.0), seq));
        }
        state
    }

    fn kill(state: &mut ArenaState, byte: u8) {
        state.mutate_player(&pid(byte), |p| {
            p.alive = false;
            p.health = 0.0;
        });
    }

    fn round_winners(state: &mut ArenaState) -> Vec<Option<String>> {
        state
            .take_events()
            .into_iter()
            .filter_map(|e| match e.data {
                GameEventData::RoundWinner { winner_name, .. } => Some(winner_name),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_second_join_starts_battle() {
        let mut state = arena(1);
        on_player_joined(&mut state);
        assert_eq!(state.phase(), MatchPhase::Waiting);

        let seq = state.next_join_seq();
        state.upsert_player(Player::new(pid(2), "P2".into(), "red".into(), Vec2::ZERO, seq));
        on_player_joined(&mut state);
        assert_eq!(state.phase(), MatchPhase::Active);

        assert!(state.take_events().iter().any(|e| matches!(
            e.data,
            GameEventData::PhaseChanged { from: MatchPhaseKind::Waiting, to: MatchPhaseKind::Active }
        )));
    }

    #[test]
    fn test_begin_battle_revives_in_place() {
        let mut state = arena(2);
        kill(&mut state, 2);

        begin_battle(&mut state);

        let revived = state.player(&pid(2)).unwrap();
        assert!(revived.alive);
        assert_eq!(revived.health, MAX_HEALTH);
        assert_eq!(revived.position, Vec2::new(200.0, 200.0));
    }

    #[test]
    fn test_sole_survivor_wins_once() {
        let config = ArenaConfig::default();
        let mut state = arena(3);
        state.set_phase(MatchPhase::Active);

        kill(&mut state, 2);
        assert!(!evaluate_win(&mut state, &config));

        kill(&mut state, 3);
        assert!(evaluate_win(&mut state, &config));
        assert!(!evaluate_win(&mut state, &config));

        assert_eq!(state.player(&pid(1)).unwrap().wins, 1);
        assert_eq!(round_winners(&mut state), vec![Some("P1".to_string())]);
        assert_eq!(
            state.phase(),
            MatchPhase::RoundEnding { ticks_remaining: config.round_end_ticks, winner: Some(pid(1)) }
        );
    }

    #[test]
    fn test_mutual_kill_is_a_draw() {
        let config = ArenaConfig::default();
        let mut state = arena(2);
        state.set_phase(MatchPhase::Active);
        kill(&mut state, 1);
        kill(&mut state, 2);

        assert!(evaluate_win(&mut state, &config));

        assert!(state.list_players().all(|p| p.wins == 0));
        assert_eq!(round_winners(&mut state), vec![None]);
        assert_eq!(
            state.phase(),
            MatchPhase::RoundEnding { ticks_remaining: config.draw_end_ticks, winner: None }
        );
    }

    #[test]
    fn test_no_win_outside_active() {
        let config = ArenaConfig::default();
        let mut state = arena(2);
        kill(&mut state, 2);
        assert!(!evaluate_win(&mut state, &config));
        assert_eq!(state.phase(), MatchPhase::Waiting);
    }

    #[test]
    fn test_round_end_counts_down_then_resets() {
        let config = ArenaConfig { round_end_ticks: 3, ..Default::default() };
        let mut state = arena(2);
        state.set_phase(MatchPhase::Active);
        kill(&mut state, 2);
        evaluate_win(&mut state, &config);

        advance_round_end(&mut state, &config);
        advance_round_end(&mut state, &config);
        assert_eq!(state.phase().kind(), MatchPhaseKind::RoundEnding);

        advance_round_end(&mut state, &config);
        assert_eq!(state.phase(), MatchPhase::Active);
        assert!(state.list_players().all(|p| p.alive && p.health == MAX_HEALTH));
        assert!(state.take_events().iter().any(|e| e.data == GameEventData::RoundReset));
    }

    #[test]
    fn test_round_end_suppressed_when_players_leave() {
        let config = ArenaConfig::default();
        let mut state = arena(2);
        state.set_phase(MatchPhase::RoundEnding { ticks_remaining: 100, winner: Some(pid(1)) });
        state.remove_player(&pid(2));

        on_player_left(&mut state, &config);

        assert_eq!(state.phase(), MatchPhase::Waiting);
        assert!(!state.take_events().iter().any(|e| e.data == GameEventData::RoundReset));
    }

    #[test]
    fn test_reset_round_is_idempotent_in_effect() {
        let config = ArenaConfig::default();
        let mut state = arena(2);
        state.set_phase(MatchPhase::Active);
        state.mutate_player(&pid(1), |p| {
            p.health = 12.5;
            p.equipment = Equipment::RangedWeapon;
            p.speed_boost_ticks = 40;
            p.last_attack_tick = Some(3);
        });
        kill(&mut state, 2);
        state.add_item(ItemKind::Healing, Vec2::new(10.0, 10.0));
        state.add_projectile(pid(1), Vec2::new(10.0, 10.0), Vec2::new(1.0, 0.0));

        let max = config.max_position();
        for _ in 0..3 {
            reset_round(&mut state, &config);

            assert_eq!(state.phase(), MatchPhase::Active);
            assert_eq!(state.list_items().count(), 0);
            assert_eq!(state.list_projectiles().count(), 0);
            for p in state.list_players() {
                assert!(p.alive);
                assert_eq!(p.health, MAX_HEALTH);
                assert_eq!(p.equipment, Equipment::None);
                assert_eq!(p.speed_boost_ticks, 0);
                assert_eq!(p.last_attack_tick, None);
                assert!(p.position.x >= 0.0 && p.position.x <= max.x);
                assert!(p.position.y >= 0.0 && p.position.y <= max.y);
            }
        }
    }

    #[test]
    fn test_last_leave_clears_ground() {
        let config = ArenaConfig::default();
        let mut state = arena(1);
        state.set_phase(MatchPhase::Active);
        state.add_item(ItemKind::MeleeWeapon, Vec2::new(50.0, 50.0));
        state.add_projectile(pid(1), Vec2::new(10.0, 10.0), Vec2::new(1.0, 0.0));
        state.remove_player(&pid(1));

        on_player_left(&mut state, &config);

        assert_eq!(state.phase(), MatchPhase::Waiting);
        assert_eq!(state.list_items().count(), 0);
        assert_eq!(state.list_projectiles().count(), 0);
        assert!(round_winners(&mut state).is_empty());
    }
}
