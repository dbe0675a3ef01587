//! Arena Configuration
//!
//! Every tunable of the simulation lives here. Durations are expressed in
//! simulation ticks; `tick_rate` converts them to wall time for the client.

use std::str::FromStr;
use thiserror::Error;

use crate::core::vec2::Vec2;
use crate::game::state::ItemKind;

/// Configuration errors (raised while reading overrides).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Environment variable could not be parsed.
    #[error("invalid value {value:?} for {name}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// Value parsed but is not usable.
    #[error("{name} out of range: {reason}")]
    OutOfRange {
        /// Field name
        name: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Spawn timer settings for one item kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemSpawnConfig {
    /// Ticks between spawn attempts
    pub interval_ticks: u32,
    /// Maximum live instances on the ground
    pub max_live: usize,
}

/// Configuration for the arena simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaConfig {
    /// Simulation rate (Hz)
    pub tick_rate: u32,
    /// Arena width
    pub width: f32,
    /// Arena height
    pub height: f32,
    /// Entity footprint (positions clamp to `[0, size - footprint]`)
    pub footprint: f32,
    /// Connected-player cap
    pub max_players: usize,
    /// Maximum display name length (chars)
    pub name_max_len: usize,
    /// Distance kept from the walls when spawning players
    pub spawn_margin: f32,
    /// RNG seed; derived at startup when `None`
    pub seed: Option<u64>,

    /// Units moved per move intent
    pub base_speed: f32,
    /// Units moved per move intent while boosted
    pub boosted_speed: f32,
    /// Boost duration after a healing pickup
    pub speed_boost_ticks: u32,

    /// Dash displacement
    pub dash_distance: f32,
    /// Minimum ticks between dashes
    pub dash_cooldown_ticks: u64,
    /// Minimum ticks between attacks (any weapon)
    pub attack_cooldown_ticks: u64,

    /// Bare-handed reach
    pub unarmed_range: f32,
    /// Melee-weapon reach
    pub melee_range: f32,
    /// Bare-handed damage
    pub peck_damage: f32,
    /// Melee-weapon damage
    pub melee_damage: f32,
    /// Projectile damage
    pub ranged_damage: f32,
    /// Probability of a critical hit
    pub crit_chance: f32,
    /// Damage multiplier on a critical hit
    pub crit_multiplier: f32,
    /// Bare-handed knockback
    pub unarmed_knockback: f32,
    /// Melee-weapon knockback
    pub melee_knockback: f32,

    /// Projectile displacement per tick
    pub projectile_speed: f32,
    /// Projectile-vs-player hit radius
    pub projectile_hit_radius: f32,

    /// Width of the electrified band along the walls
    pub hazard_margin: f32,
    /// Damage per tick inside the band
    pub hazard_damage: f32,
    /// Chance per tick of sending hazard hit feedback
    pub hazard_feedback_chance: f32,

    /// Pickup distance
    pub pickup_radius: f32,
    /// Health restored by a healing item
    pub heal_amount: f32,
    /// Distance kept from the walls when spawning items
    pub item_margin: f32,
    /// Healing item timer
    pub healing: ItemSpawnConfig,
    /// Melee weapon timer
    pub melee_weapon: ItemSpawnConfig,
    /// Ranged weapon timer
    pub ranged_weapon: ItemSpawnConfig,

    /// Delay before a won round resets
    pub round_end_ticks: u32,
    /// Delay before a drawn round resets
    pub draw_end_ticks: u32,
    /// Number of leaderboard entries broadcast
    pub leaderboard_size: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            width: 800.0,
            height: 600.0,
            footprint: 60.0,
            max_players: 8,
            name_max_len: 15,
            spawn_margin: 50.0,
            seed: None,

            base_speed: 7.0,
            boosted_speed: 12.0,
            speed_boost_ticks: 180, // 3 seconds

            dash_distance: 100.0,
            dash_cooldown_ticks: 60,   // 1 second
            attack_cooldown_ticks: 24, // 400 ms

            unarmed_range: 70.0,
            melee_range: 120.0,
            peck_damage: 0.8,
            melee_damage: 1.2,
            ranged_damage: 2.0,
            crit_chance: 0.20,
            crit_multiplier: 2.0,
            unarmed_knockback: 10.0,
            melee_knockback: 20.0,

            projectile_speed: 12.0,
            projectile_hit_radius: 30.0,

            hazard_margin: 10.0,
            hazard_damage: 0.5,
            hazard_feedback_chance: 0.15,

            pickup_radius: 50.0,
            heal_amount: 30.0,
            item_margin: 30.0,
            healing: ItemSpawnConfig { interval_ticks: 2100, max_live: 10 },
            melee_weapon: ItemSpawnConfig { interval_ticks: 2400, max_live: 5 },
            ranged_weapon: ItemSpawnConfig { interval_ticks: 3000, max_live: 3 },

            round_end_ticks: 300, // 5 seconds
            draw_end_ticks: 180,  // 3 seconds
            leaderboard_size: 5,
        }
    }
}

impl ArenaConfig {
    /// Defaults with environment overrides applied.
    ///
    /// Reads `ARENA_MAX_PLAYERS`, `ARENA_SEED`, `ARENA_WIDTH`, `ARENA_HEIGHT`
    /// and `TICK_RATE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = env_parse("ARENA_MAX_PLAYERS")? {
            config.max_players = v;
        }
        if let Some(v) = env_parse("ARENA_SEED")? {
            config.seed = Some(v);
        }
        if let Some(v) = env_parse("ARENA_WIDTH")? {
            config.width = v;
        }
        if let Some(v) = env_parse("ARENA_HEIGHT")? {
            config.height = v;
        }
        if let Some(v) = env_parse("TICK_RATE")? {
            config.tick_rate = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::OutOfRange { name: "tick_rate", reason: "must be positive" });
        }
        if self.max_players < 2 {
            return Err(ConfigError::OutOfRange { name: "max_players", reason: "a battle needs two players" });
        }
        let lengths = [
            ("width", self.width),
            ("height", self.height),
            ("footprint", self.footprint),
            ("spawn_margin", self.spawn_margin),
            ("base_speed", self.base_speed),
            ("boosted_speed", self.boosted_speed),
            ("dash_distance", self.dash_distance),
            ("unarmed_range", self.unarmed_range),
            ("melee_range", self.melee_range),
            ("peck_damage", self.peck_damage),
            ("melee_damage", self.melee_damage),
            ("ranged_damage", self.ranged_damage),
            ("crit_multiplier", self.crit_multiplier),
            ("unarmed_knockback", self.unarmed_knockback),
            ("melee_knockback", self.melee_knockback),
            ("projectile_speed", self.projectile_speed),
            ("projectile_hit_radius", self.projectile_hit_radius),
            ("hazard_margin", self.hazard_margin),
            ("hazard_damage", self.hazard_damage),
            ("pickup_radius", self.pickup_radius),
            ("heal_amount", self.heal_amount),
            ("item_margin", self.item_margin),
        ];
        if let Some(&(name, _)) = lengths.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::OutOfRange { name, reason: "must be finite and non-negative" });
        }
        let min_side = self.footprint + 2.0 * self.spawn_margin;
        if self.width <= min_side || self.height <= min_side {
            return Err(ConfigError::OutOfRange { name: "width/height", reason: "arena smaller than spawn area" });
        }
        if !(0.0..=1.0).contains(&self.crit_chance) {
            return Err(ConfigError::OutOfRange { name: "crit_chance", reason: "must be a probability" });
        }
        if !(0.0..=1.0).contains(&self.hazard_feedback_chance) {
            return Err(ConfigError::OutOfRange { name: "hazard_feedback_chance", reason: "must be a probability" });
        }
        Ok(())
    }

    /// Largest valid entity position.
    #[inline]
    pub fn max_position(&self) -> Vec2 {
        Vec2::new(self.width - self.footprint, self.height - self.footprint)
    }

    /// Clamp a position to arena bounds minus the entity footprint.
    #[inline]
    pub fn clamp_position(&self, position: Vec2) -> Vec2 {
        position.clamp(Vec2::ZERO, self.max_position())
    }

    /// Check whether a point lies inside the arena rectangle.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }

    /// Check whether a position touches the electrified band.
    pub fn in_hazard_band(&self, position: Vec2) -> bool {
        let max = self.max_position();
        position.x <= self.hazard_margin
            || position.x >= max.x - self.hazard_margin
            || position.y <= self.hazard_margin
            || position.y >= max.y - self.hazard_margin
    }

    /// Spawn timer settings for an item kind.
    pub fn spawn_config(&self, kind: ItemKind) -> ItemSpawnConfig {
        match kind {
            ItemKind::Healing => self.healing,
            ItemKind::MeleeWeapon => self.melee_weapon,
            ItemKind::RangedWeapon => self.ranged_weapon,
        }
    }

    /// Convert a tick count to milliseconds (rounded up).
    pub fn ticks_to_ms(&self, ticks: u64) -> u64 {
        (ticks * 1000).div_ceil(self.tick_rate as u64)
    }
}

/// Parse an optional environment variable.
pub(crate) fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(None),
    }
}
