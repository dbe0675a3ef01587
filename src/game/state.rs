//! Arena State
//!
//! The World State Store: players, ground items, in-flight projectiles and the
//! match phase. Every other module reads and mutates the arena through the
//! methods here. Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::core::vec2::Vec2;
use crate::core::rng::DeterministicRng;
use crate::core::hash::{StateHash, StateHasher, compute_state_hash};
use crate::game::config::ArenaConfig;
use crate::game::events::GameEvent;

/// Full health.
pub const MAX_HEALTH: f32 = 100.0;

/// Round health to one decimal place.
#[inline]
pub fn round_health(health: f32) -> f32 {
    ((health * 10.0).round() / 10.0).clamp(0.0, MAX_HEALTH)
}

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (UUID as bytes), one per connection.
///
/// Implements Ord for deterministic BTreeMap ordering. Serialized as the
/// hyphenated UUID string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Uuid", into = "Uuid")]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Allocate a fresh random identity.
    pub fn new_random() -> Self {
        Self(*Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self::from)
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        Uuid::from_bytes(self.0).to_string()
    }

    /// First four bytes as hex, for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<Uuid> for PlayerId {
    fn from(uuid: Uuid) -> Self {
        Self(*uuid.as_bytes())
    }
}

impl From<PlayerId> for Uuid {
    fn from(id: PlayerId) -> Self {
        Uuid::from_bytes(id.0)
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.short_hex())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid_string())
    }
}

// =============================================================================
// ITEMS AND EQUIPMENT
// =============================================================================

/// Type of ground pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ItemKind {
    /// Restores health and grants a speed boost
    Healing = 0,
    /// Longer reach, harder hits, stronger knockback
    MeleeWeapon = 1,
    /// Attacks fire projectiles
    RangedWeapon = 2,
}

impl ItemKind {
    /// All kinds, in spawn-timer order.
    pub const ALL: [ItemKind; 3] = [ItemKind::Healing, ItemKind::MeleeWeapon, ItemKind::RangedWeapon];

    /// Equipment granted when picked up (weapons only).
    pub fn equipment(self) -> Option<Equipment> {
        match self {
            ItemKind::Healing => None,
            ItemKind::MeleeWeapon => Some(Equipment::MeleeWeapon),
            ItemKind::RangedWeapon => Some(Equipment::RangedWeapon),
        }
    }

    /// Bubble shown over the player who picks this up.
    pub fn pickup_cheer(self) -> Option<&'static str> {
        match self {
            ItemKind::Healing => Some("DELÍCIA!"),
            ItemKind::MeleeWeapon => Some("MARRETA!"),
            ItemKind::RangedWeapon => None,
        }
    }
}

/// What a player is holding. At most one weapon at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Equipment {
    /// Bare-handed
    #[default]
    None = 0,
    /// Melee weapon
    MeleeWeapon = 1,
    /// Ranged weapon
    RangedWeapon = 2,
}

impl Equipment {
    /// Ground item this equipment turns back into when dropped.
    pub fn item_kind(self) -> Option<ItemKind> {
        match self {
            Equipment::None => None,
            Equipment::MeleeWeapon => Some(ItemKind::MeleeWeapon),
            Equipment::RangedWeapon => Some(ItemKind::RangedWeapon),
        }
    }
}

/// A pickup lying on the ground.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item ID (monotonic counter)
    pub id: u32,
    /// Type of item
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Position in arena
    pub position: Vec2,
}

/// A shot fired by a ranged weapon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique projectile ID (monotonic counter)
    pub id: u32,
    /// Shooter
    pub owner: PlayerId,
    /// Current position
    pub position: Vec2,
    /// Displacement per tick
    pub velocity: Vec2,
}

// =============================================================================
// PLAYER
// =============================================================================

/// State of a single connected player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Connection identity
    pub id: PlayerId,
    /// Display name (trimmed, length-bounded)
    pub name: String,
    /// Display color
    pub color: String,
    /// Top-left corner of the footprint
    pub position: Vec2,
    /// Facing direction: +1 right, -1 left
    pub facing: i8,
    /// Health in [0, 100]
    pub health: f32,
    /// Dead players accept no movement, attack or pickup until revived
    pub alive: bool,
    /// Held weapon
    pub equipment: Equipment,
    /// Remaining boosted-speed ticks
    pub speed_boost_ticks: u32,
    /// Tick of the last accepted attack
    pub last_attack_tick: Option<u64>,
    /// Tick of the last accepted dash
    pub last_dash_tick: Option<u64>,
    /// Rounds won
    pub wins: u32,
    /// Join order (leaderboard tie-break)
    pub join_seq: u64,
}

impl Player {
    /// Create a new player at full health.
    pub fn new(id: PlayerId, name: String, color: String, position: Vec2, join_seq: u64) -> Self {
        Self {
            id,
            name,
            color,
            position,
            facing: 1,
            health: MAX_HEALTH,
            alive: true,
            equipment: Equipment::None,
            speed_boost_ticks: 0,
            last_attack_tick: None,
            last_dash_tick: None,
            wins: 0,
            join_seq,
        }
    }

    /// Current movement speed.
    #[inline]
    pub fn speed(&self, config: &ArenaConfig) -> f32 {
        if self.speed_boost_ticks > 0 {
            config.boosted_speed
        } else {
            config.base_speed
        }
    }

    /// Unit vector along the facing direction.
    #[inline]
    pub fn facing_vector(&self) -> Vec2 {
        if self.facing < 0 {
            Vec2::LEFT
        } else {
            Vec2::RIGHT
        }
    }

    /// Ticks left before an action with the given cooldown is allowed again.
    pub fn cooldown_remaining(last: Option<u64>, cooldown: u64, now: u64) -> u64 {
        match last {
            Some(last) => cooldown.saturating_sub(now.saturating_sub(last)),
            None => 0,
        }
    }

    /// Restore full health and clear per-round state. Wins are kept.
    pub fn reset_for_round(&mut self, position: Vec2) {
        self.position = position;
        self.health = MAX_HEALTH;
        self.alive = true;
        self.equipment = Equipment::None;
        self.speed_boost_ticks = 0;
        self.last_attack_tick = None;
        self.last_dash_tick = None;
    }

    /// Hash this player's state.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_uuid(&self.id.0);
        hasher.update_str(&self.name);
        hasher.update_str(&self.color);
        hasher.update_vec2(self.position);
        hasher.update_u8(self.facing as u8);
        hasher.update_f32(self.health);
        hasher.update_bool(self.alive);
        hasher.update_u8(self.equipment as u8);
        hasher.update_u32(self.speed_boost_ticks);
        hasher.update_u32(self.wins);
    }
}

// =============================================================================
// MATCH PHASE
// =============================================================================

/// Current phase of the match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MatchPhase {
    /// Fewer than two players; no damage
    #[default]
    Waiting,
    /// Battle in progress
    Active,
    /// Round decided; reset pending
    RoundEnding {
        /// Ticks until the reset
        ticks_remaining: u32,
        /// Sole survivor, `None` on a draw
        winner: Option<PlayerId>,
    },
}

impl MatchPhase {
    /// Phase without its payload.
    pub fn kind(&self) -> MatchPhaseKind {
        match self {
            MatchPhase::Waiting => MatchPhaseKind::Waiting,
            MatchPhase::Active => MatchPhaseKind::Active,
            MatchPhase::RoundEnding { .. } => MatchPhaseKind::RoundEnding,
        }
    }
}

/// Phase discriminant, used on the wire and in errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MatchPhaseKind {
    /// Waiting for players
    Waiting = 0,
    /// Battle in progress
    Active = 1,
    /// Round decided
    RoundEnding = 2,
}

impl fmt::Display for MatchPhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchPhaseKind::Waiting => "waiting",
            MatchPhaseKind::Active => "active",
            MatchPhaseKind::RoundEnding => "round_ending",
        };
        f.write_str(name)
    }
}

/// Elapsed ticks of each item spawn timer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnTimers {
    elapsed: [u32; 3],
}

impl SpawnTimers {
    /// Elapsed ticks for a kind.
    pub fn elapsed(&self, kind: ItemKind) -> u32 {
        self.elapsed[kind as usize]
    }

    /// Mutable elapsed ticks for a kind.
    pub fn elapsed_mut(&mut self, kind: ItemKind) -> &mut u32 {
        &mut self.elapsed[kind as usize]
    }

    /// Restart every timer.
    pub fn reset(&mut self) {
        self.elapsed = [0; 3];
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Broadcast view of a player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Identity
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Display color
    pub color: String,
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
    /// Facing (+1 / -1)
    pub facing: i8,
    /// Health
    pub health: f32,
    /// Alive flag
    pub alive: bool,
    /// Held weapon
    pub equipment: Equipment,
    /// Speed boost active
    pub boosted: bool,
    /// Rounds won
    pub wins: u32,
}

impl From<&Player> for PlayerSnapshot {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            color: player.color.clone(),
            x: player.position.x,
            y: player.position.y,
            facing: player.facing,
            health: player.health,
            alive: player.alive,
            equipment: player.equipment,
            boosted: player.speed_boost_ticks > 0,
            wins: player.wins,
        }
    }
}

/// Broadcast view of a projectile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    /// Projectile ID
    pub id: u32,
    /// Shooter
    pub owner: PlayerId,
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(projectile: &Projectile) -> Self {
        Self {
            id: projectile.id,
            owner: projectile.owner,
            x: projectile.position.x,
            y: projectile.position.y,
        }
    }
}

/// One leaderboard row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Identity
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Rounds won
    pub wins: u32,
}

/// Immutable point-in-time copy of the arena, safe to serialize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Simulation tick
    pub tick: u64,
    /// Match phase
    pub phase: MatchPhaseKind,
    /// Every connected player
    pub players: Vec<PlayerSnapshot>,
    /// Ground items
    pub items: Vec<Item>,
    /// In-flight projectiles
    pub projectiles: Vec<ProjectileSnapshot>,
    /// Hex SHA-256 digest of the state above
    pub state_hash: String,
}

impl WorldSnapshot {
    /// Find a player in the snapshot.
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == *id)
    }
}

// =============================================================================
// ARENA STATE
// =============================================================================

/// Complete state of the arena.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Clone, Debug)]
pub struct ArenaState {
    /// Current tick
    tick: u64,

    /// Current match phase
    phase: MatchPhase,

    /// RNG seed (for replay)
    rng_seed: u64,

    /// Deterministic RNG state
    rng: DeterministicRng,

    /// Connected players
    players: BTreeMap<PlayerId, Player>,

    /// Ground items
    items: BTreeMap<u32, Item>,

    /// In-flight projectiles
    projectiles: BTreeMap<u32, Projectile>,

    next_item_id: u32,
    next_projectile_id: u32,
    next_join_seq: u64,

    /// Item spawn timers
    pub(crate) spawn_timers: SpawnTimers,

    /// Whether the last projectile update carried any projectiles
    pub(crate) projectiles_visible: bool,

    /// Events generated since the last drain
    pending_events: Vec<GameEvent>,
}

impl ArenaState {
    /// Create an empty arena in the Waiting phase.
    pub fn new(rng_seed: u64) -> Self {
        Self {
            tick: 0,
            phase: MatchPhase::Waiting,
            rng_seed,
            rng: DeterministicRng::new(rng_seed),
            players: BTreeMap::new(),
            items: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            next_item_id: 0,
            next_projectile_id: 0,
            next_join_seq: 0,
            spawn_timers: SpawnTimers::default(),
            projectiles_visible: false,
            pending_events: Vec::new(),
        }
    }

    /// Current tick.
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance the simulation clock by one tick.
    pub(crate) fn advance_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Replace the phase. Lifecycle transitions go through `game::lifecycle`.
    pub(crate) fn set_phase(&mut self, phase: MatchPhase) {
        self.phase = phase;
    }

    /// Seed this arena was created with.
    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Shared RNG for spawns and rolls.
    pub(crate) fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    /// Random player spawn inside the spawn margin.
    pub fn random_spawn(&mut self, config: &ArenaConfig) -> Vec2 {
        let margin = Vec2::new(config.spawn_margin, config.spawn_margin);
        self.rng.random_point(margin, config.max_position() - margin)
    }

    /// Allocate the next join sequence number.
    pub(crate) fn next_join_seq(&mut self) -> u64 {
        let seq = self.next_join_seq;
        self.next_join_seq += 1;
        seq
    }

    // =========================================================================
    // Players
    // =========================================================================

    /// Insert or replace a player record. Returns the previous record.
    pub fn upsert_player(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.id, player)
    }

    /// Remove a player record.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        self.players.remove(id)
    }

    /// Mutate a player in place. Returns `None` if the player is unknown.
    pub fn mutate_player<R>(&mut self, id: &PlayerId, f: impl FnOnce(&mut Player) -> R) -> Option<R> {
        self.players.get_mut(id).map(f)
    }

    /// Mutate every player in deterministic order.
    pub fn mutate_all_players(&mut self, mut f: impl FnMut(&mut Player)) {
        for player in self.players.values_mut() {
            f(player);
        }
    }

    /// Get a player by ID.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Iterate players in deterministic order.
    pub fn list_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Connected player IDs.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    /// Connected player count.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Count of living players.
    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Put an item on the ground. Returns its ID.
    pub fn add_item(&mut self, kind: ItemKind, position: Vec2) -> u32 {
        let id = self.next_item_id;
        self.next_item_id = self.next_item_id.wrapping_add(1);
        self.items.insert(id, Item { id, kind, position });
        id
    }

    /// Remove an item from the ground.
    pub fn remove_item(&mut self, id: u32) -> Option<Item> {
        self.items.remove(&id)
    }

    /// Get an item by ID.
    pub fn item(&self, id: u32) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Iterate ground items in ID order.
    pub fn list_items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Live count of one item kind.
    pub fn item_count(&self, kind: ItemKind) -> usize {
        self.items.values().filter(|i| i.kind == kind).count()
    }

    /// Remove every ground item. Returns how many were removed.
    pub fn clear_items(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }

    // =========================================================================
    // Projectiles
    // =========================================================================

    /// Launch a projectile. Returns its ID.
    pub fn add_projectile(&mut self, owner: PlayerId, position: Vec2, velocity: Vec2) -> u32 {
        let id = self.next_projectile_id;
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
        self.projectiles.insert(id, Projectile { id, owner, position, velocity });
        id
    }

    /// Remove a projectile.
    pub fn remove_projectile(&mut self, id: u32) -> Option<Projectile> {
        self.projectiles.remove(&id)
    }

    /// Mutate a projectile in place.
    pub fn mutate_projectile<R>(&mut self, id: u32, f: impl FnOnce(&mut Projectile) -> R) -> Option<R> {
        self.projectiles.get_mut(&id).map(f)
    }

    /// Iterate projectiles in ID order.
    pub fn list_projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    /// In-flight projectile IDs.
    pub fn projectile_ids(&self) -> Vec<u32> {
        self.projectiles.keys().copied().collect()
    }

    /// Remove every projectile.
    pub fn clear_projectiles(&mut self) {
        self.projectiles.clear();
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Players ranked by wins (descending), ties by join order.
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut ranked: Vec<&Player> = self.players.values().collect();
        ranked.sort_by(|a, b| b.wins.cmp(&a.wins).then(a.join_seq.cmp(&b.join_seq)));
        ranked
            .into_iter()
            .take(limit)
            .map(|p| LeaderboardEntry { id: p.id, name: p.name.clone(), wins: p.wins })
            .collect()
    }

    /// Compute hash of current state.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, |hasher| {
            hasher.update_u8(self.phase.kind() as u8);

            for player in self.players.values() {
                player.hash_into(hasher);
            }

            for item in self.items.values() {
                hasher.update_u32(item.id);
                hasher.update_u8(item.kind as u8);
                hasher.update_vec2(item.position);
            }

            for projectile in self.projectiles.values() {
                hasher.update_u32(projectile.id);
                hasher.update_uuid(&projectile.owner.0);
                hasher.update_vec2(projectile.position);
                hasher.update_vec2(projectile.velocity);
            }
        })
    }

    /// Copy the arena into a broadcastable snapshot.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            phase: self.phase.kind(),
            players: self.players.values().map(PlayerSnapshot::from).collect(),
            items: self.items.values().cloned().collect(),
            projectiles: self.projectiles.values().map(ProjectileSnapshot::from).collect(),
            state_hash: hex::encode(self.compute_hash()),
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

// =============================================================================
// TESTS
// =============================================================================
