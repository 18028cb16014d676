//! # Game Configuration
//!
//! Every tunable in one TOML document. Every field has a default, so an
//! empty file (or no file) is a valid configuration.
//!
//! ```toml
//! [world]
//! size = 200.0
//! seed = 7
//!
//! [cloud]
//! trigger_radius = 15.0
//! ```
//!
//! Units: player motion is per tick (the player model is tick-rate bound);
//! stone, tower, cloud and network timings are per second.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// World geometry and clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of the square world.
    pub size: f32,
    /// Water surface height.
    pub sea_level: f32,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Seed for clouds, spawns and generated ids.
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: 200.0,
            sea_level: 0.0,
            tick_rate: cairn_shared::DEFAULT_TICK_RATE,
            seed: 0x00C4_1A2F,
        }
    }
}

impl WorldConfig {
    /// Half the world edge.
    #[must_use]
    pub fn half_size(&self) -> f32 {
        self.size / 2.0
    }

    /// Seconds per tick.
    #[must_use]
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

/// Owning-client player model. Speeds are per tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Top forward speed.
    pub max_move_speed: f32,
    /// Forward speed gained per tick while input is held.
    pub move_acceleration: f32,
    /// Forward speed lost per tick without input.
    pub move_deceleration: f32,
    /// Top turn rate in radians per tick.
    pub max_turn_speed: f32,
    /// Turn rate gained per tick.
    pub turn_acceleration: f32,
    /// Turn rate lost per tick.
    pub turn_deceleration: f32,
    /// Multiplier on top speed while sprinting.
    pub sprint_multiplier: f32,
    /// Vertical velocity set by a jump.
    pub jump_impulse: f32,
    /// Vertical velocity lost per airborne tick.
    pub gravity: f32,
    /// Eye/feet offset above the ground.
    pub base_height: f32,
    /// Exponential smoothing factor toward the resting height.
    pub height_smoothing: f32,
    /// Climb speed in units per second.
    pub climb_rate: f32,
    /// Fraction of the world half-size players may walk to.
    pub boundary_factor: f32,
    /// Carry limit.
    pub max_held_stones: usize,
    /// Horizontal reach for picking up stones.
    pub pickup_reach: f32,
    /// Horizontal speed of a thrown stone in units per second.
    pub throw_speed: f32,
    /// Upward speed of a thrown stone in units per second.
    pub throw_lift: f32,
    /// Vertical spacing of carried stones above the holder.
    pub carry_spacing: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_move_speed: 0.15,
            move_acceleration: 0.01,
            move_deceleration: 0.02,
            max_turn_speed: 0.05,
            turn_acceleration: 0.005,
            turn_deceleration: 0.01,
            sprint_multiplier: 2.0,
            jump_impulse: 0.3,
            gravity: 0.015,
            base_height: 1.0,
            height_smoothing: 0.2,
            climb_rate: 2.0,
            boundary_factor: 0.95,
            max_held_stones: cairn_shared::MAX_HELD_STONES,
            pickup_reach: 2.5,
            throw_speed: 10.0,
            throw_lift: 5.0,
            carry_spacing: 0.7,
        }
    }
}

/// Stone ballistics. Accelerations are per second squared, decay per tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoneConfig {
    /// Collision radius.
    pub radius: f32,
    /// Downward acceleration.
    pub gravity: f32,
    /// Falling speed above which a landing bounces.
    pub bounce_threshold: f32,
    /// Fraction of vertical speed kept on a bounce.
    pub bounce_damping: f32,
    /// Horizontal speed lost per tick on the ground.
    pub ground_friction: f32,
    /// Speed lost per tick on every axis.
    pub air_resistance: f32,
    /// Below this on every axis the stone comes to rest.
    pub static_epsilon: f32,
    /// Horizontal pull toward the centre while in water.
    pub water_restoring: f32,
    /// Upward acceleration while in water.
    pub water_buoyancy: f32,
    /// Fraction of the world half-size beyond which stones are in water.
    pub water_zone_factor: f32,
}

impl Default for StoneConfig {
    fn default() -> Self {
        Self {
            radius: 0.3,
            gravity: 9.8,
            bounce_threshold: 2.0,
            bounce_damping: 0.5,
            ground_friction: 0.05,
            air_resistance: 0.01,
            static_epsilon: 0.05,
            water_restoring: 0.5,
            water_buoyancy: 12.0,
            water_zone_factor: 0.9,
        }
    }
}

/// Tower geometry and transformation thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerConfig {
    /// Footprint radius `r`.
    pub base_radius: f32,
    /// Height of one level.
    pub block_height: f32,
    /// A stone closer than `raise_factor × r` raises the nearest tower.
    pub raise_factor: f32,
    /// A stone farther than `found_factor × r` founds a new tower.
    pub found_factor: f32,
    /// Seconds a thrown stone must wait before it may transform.
    pub settle_delay: f32,
    /// Players within `climb_factor × r` climb the tower.
    pub climb_factor: f32,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            base_radius: 2.0,
            block_height: 1.0,
            raise_factor: 1.5,
            found_factor: 2.0,
            settle_delay: 1.0,
            climb_factor: 1.3,
        }
    }
}

impl TowerConfig {
    /// Distance below which a stone raises a tower.
    #[must_use]
    pub fn raise_distance(&self) -> f32 {
        self.base_radius * self.raise_factor
    }

    /// Distance above which a stone founds a tower.
    #[must_use]
    pub fn found_distance(&self) -> f32 {
        self.base_radius * self.found_factor
    }

    /// Horizontal radius within which players climb.
    #[must_use]
    pub fn climb_radius(&self) -> f32 {
        self.base_radius * self.climb_factor
    }
}

/// Cloud hazard timings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Drift speed in units per second.
    pub speed: f32,
    /// Cosmetic height.
    pub height: f32,
    /// Horizontal reach of the tower scan.
    pub trigger_radius: f32,
    /// Seconds idle before scanning.
    pub idle_duration: f32,
    /// Seconds of rain.
    pub rain_duration: f32,
    /// Seconds of flood.
    pub flood_duration: f32,
    /// Maximum random perturbation on a boundary bounce.
    pub bounce_jitter: f32,
    /// Clouds created at server start.
    pub count: usize,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            speed: 3.0,
            height: 30.0,
            trigger_radius: 15.0,
            idle_duration: 5.0,
            rain_duration: 5.0,
            flood_duration: 3.0,
            bounce_jitter: 0.2,
            count: 2,
        }
    }
}

/// Client sync tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server address for clients.
    pub server_addr: String,
    /// Seconds between local player broadcasts.
    pub broadcast_interval: f32,
    /// Seconds without an update before a remote player is pruned.
    pub liveness_timeout: f32,
    /// Per-tick blend toward a remote player's target.
    pub remote_blend: f32,
    /// Snap distance for remote interpolation.
    pub remote_snap_epsilon: f32,
    /// Correction error above which the local player snaps.
    pub correction_snap_threshold: f32,
    /// Per-tick blend toward a correction target.
    pub correction_blend: f32,
    /// Reconnect attempts before going offline.
    pub reconnect_attempts: u32,
    /// Seconds between reconnect attempts.
    pub reconnect_backoff: f32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_addr: cairn_shared::DEFAULT_SERVER_ADDR.to_owned(),
            broadcast_interval: 0.05,
            liveness_timeout: cairn_shared::LIVENESS_TIMEOUT_SECS,
            remote_blend: 0.15,
            remote_snap_epsilon: 0.01,
            correction_snap_threshold: 3.0,
            correction_blend: 0.2,
            reconnect_attempts: 5,
            reconnect_backoff: 2.0,
        }
    }
}

/// Authoritative server settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind_addr: String,
    /// Free stones the spawner keeps in the world.
    pub max_stones: usize,
    /// Seconds between spawns.
    pub stone_spawn_interval: f32,
    /// Height above terrain at which stones appear.
    pub stone_spawn_height: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: cairn_shared::constants::DEFAULT_SERVER_BIND.to_owned(),
            max_stones: 20,
            stone_spawn_interval: 3.0,
            stone_spawn_height: 5.0,
        }
    }
}

/// Complete configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// World geometry.
    pub world: WorldConfig,
    /// Player model.
    pub player: PlayerConfig,
    /// Stone ballistics.
    pub stone: StoneConfig,
    /// Towers.
    pub tower: TowerConfig,
    /// Clouds.
    pub cloud: CloudConfig,
    /// Client sync.
    pub network: NetworkConfig,
    /// Server.
    pub server: ServerConfig,
}

impl GameConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`GameConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Checks ranges and cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Invalid`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        positive("world.size", self.world.size)?;
        if self.world.tick_rate == 0 {
            return Err(ConfigError::invalid("world.tick_rate", "must be at least 1"));
        }

        let p = &self.player;
        positive("player.max_move_speed", p.max_move_speed)?;
        positive("player.move_acceleration", p.move_acceleration)?;
        positive("player.move_deceleration", p.move_deceleration)?;
        positive("player.max_turn_speed", p.max_turn_speed)?;
        positive("player.turn_acceleration", p.turn_acceleration)?;
        positive("player.turn_deceleration", p.turn_deceleration)?;
        positive("player.gravity", p.gravity)?;
        positive("player.climb_rate", p.climb_rate)?;
        fraction("player.height_smoothing", p.height_smoothing)?;
        fraction("player.boundary_factor", p.boundary_factor)?;
        if p.sprint_multiplier < 1.0 {
            return Err(ConfigError::invalid("player.sprint_multiplier", "must be >= 1"));
        }
        if p.max_held_stones == 0 {
            return Err(ConfigError::invalid("player.max_held_stones", "must be at least 1"));
        }

        let s = &self.stone;
        positive("stone.radius", s.radius)?;
        positive("stone.gravity", s.gravity)?;
        positive("stone.static_epsilon", s.static_epsilon)?;
        fraction("stone.bounce_damping", s.bounce_damping)?;
        fraction("stone.ground_friction", s.ground_friction)?;
        fraction("stone.air_resistance", s.air_resistance)?;
        fraction("stone.water_zone_factor", s.water_zone_factor)?;
        if s.water_buoyancy <= s.gravity {
            return Err(ConfigError::invalid(
                "stone.water_buoyancy",
                "must exceed stone.gravity or stones sink",
            ));
        }

        let t = &self.tower;
        positive("tower.base_radius", t.base_radius)?;
        positive("tower.block_height", t.block_height)?;
        positive("tower.raise_factor", t.raise_factor)?;
        positive("tower.climb_factor", t.climb_factor)?;
        if t.settle_delay < 0.0 {
            return Err(ConfigError::invalid("tower.settle_delay", "must not be negative"));
        }
        if t.found_factor < t.raise_factor {
            return Err(ConfigError::invalid(
                "tower.found_factor",
                "must be >= tower.raise_factor",
            ));
        }

        let c = &self.cloud;
        positive("cloud.speed", c.speed)?;
        positive("cloud.trigger_radius", c.trigger_radius)?;
        positive("cloud.idle_duration", c.idle_duration)?;
        positive("cloud.rain_duration", c.rain_duration)?;
        positive("cloud.flood_duration", c.flood_duration)?;
        fraction("cloud.bounce_jitter", c.bounce_jitter)?;

        let n = &self.network;
        positive("network.broadcast_interval", n.broadcast_interval)?;
        positive("network.liveness_timeout", n.liveness_timeout)?;
        positive("network.reconnect_backoff", n.reconnect_backoff)?;
        positive("network.correction_snap_threshold", n.correction_snap_threshold)?;
        fraction("network.remote_blend", n.remote_blend)?;
        fraction("network.correction_blend", n.correction_blend)?;

        positive("server.stone_spawn_interval", self.server.stone_spawn_interval)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn fraction(field: &'static str, value: f32) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be within [0, 1], got {value}")))
    }
}
