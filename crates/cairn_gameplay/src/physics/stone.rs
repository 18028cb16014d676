//! # Stone Ballistics
//!
//! Free stones fall, bounce, roll and come to rest. Stones in water are
//! pushed back toward the island and float up. Held stones are not
//! integrated; they ride on their holder.

use cairn_core::{Collection, Player, PlayerConfig, Stone, StoneConfig, TerrainHeight, WorldConfig};
use cairn_shared::Vec3;

/// Outcome of one integration step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoneStep {
    /// Held or already static.
    Skipped,
    /// Integrated and still moving.
    Moved,
    /// Integrated and came to rest this tick.
    Settled,
}

/// True if `position` is in water: below sea level or outside the land
/// zone around the centre.
#[must_use]
pub fn in_water(position: Vec3, world: &WorldConfig, cfg: &StoneConfig) -> bool {
    position.y < world.sea_level
        || position.horizontal_length() > cfg.water_zone_factor * world.half_size()
}

/// Integrates one free stone over `dt` seconds.
///
/// A stone turns static when every velocity component is under
/// `static_epsilon` while it rests on dry ground. Near-zero velocity in the
/// air (the apex of a lob) or afloat does not count.
pub fn step_stone(
    stone: &mut Stone,
    terrain: &dyn TerrainHeight,
    world: &WorldConfig,
    cfg: &StoneConfig,
    dt: f32,
) -> StoneStep {
    if !stone.is_simulated() {
        return StoneStep::Skipped;
    }

    stone.velocity.y -= cfg.gravity * dt;
    stone.position += stone.velocity * dt;

    let wet = in_water(stone.position, world, cfg);
    if wet {
        let dist = stone.position.horizontal_length();
        if dist > f32::EPSILON {
            stone.velocity.x -= stone.position.x / dist * cfg.water_restoring * dt;
            stone.velocity.z -= stone.position.z / dist * cfg.water_restoring * dt;
        }
        // Buoyancy only below the surface, so floating stones bob there.
        if stone.position.y < world.sea_level + cfg.radius {
            stone.velocity.y += cfg.water_buoyancy * dt;
        }
    }

    let floor = terrain.height_at(stone.position.x, stone.position.z) + cfg.radius;
    let grounded = stone.position.y < floor;
    if grounded {
        stone.position.y = floor;
        if stone.velocity.y < -cfg.bounce_threshold {
            stone.velocity.y = -stone.velocity.y * cfg.bounce_damping;
        } else if stone.velocity.y < 0.0 {
            stone.velocity.y = 0.0;
        }
        stone.velocity.x *= 1.0 - cfg.ground_friction;
        stone.velocity.z *= 1.0 - cfg.ground_friction;
    }

    stone.velocity = stone.velocity * (1.0 - cfg.air_resistance);

    // Slow at the apex of a throw or bobbing in water is not at rest.
    if grounded && !wet && stone.velocity.all_below(cfg.static_epsilon) {
        stone.velocity = Vec3::ZERO;
        stone.is_static = true;
        StoneStep::Settled
    } else {
        StoneStep::Moved
    }
}

/// Position of the `index`-th stone carried by a holder at `holder`.
#[must_use]
pub fn carried_position(holder: Vec3, index: usize, cfg: &PlayerConfig) -> Vec3 {
    holder + Vec3::new(0.0, cfg.base_height + index as f32 * cfg.carry_spacing, 0.0)
}

/// Moves every held stone onto its holder's stack. Returns ids that moved.
pub fn carry_held(
    players: &Collection<Player>,
    stones: &mut Collection<Stone>,
    cfg: &PlayerConfig,
) -> Vec<String> {
    let mut moved = Vec::new();
    for player in players.iter() {
        for (index, stone_id) in player.held_stones.iter().enumerate() {
            let target = carried_position(player.position, index, cfg);
            let Some(stone) = stones.get(stone_id) else {
                continue;
            };
            if stone.position != target && stone.held_by.as_deref() == Some(player.id.as_str()) {
                stones.update(stone_id, |s| s.position = target);
                moved.push(stone_id.clone());
            }
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::{FlatTerrain, GameConfig};

    const DT: f32 = 1.0 / 60.0;

    fn run_until_static(stone: &mut Stone, config: &GameConfig, max_ticks: usize) -> usize {
        let terrain = FlatTerrain::new(0.0);
        for tick in 0..max_ticks {
            if step_stone(stone, &terrain, &config.world, &config.stone, DT) == StoneStep::Settled {
                return tick;
            }
        }
        max_ticks
    }

    #[test]
    fn test_dropped_stone_comes_to_rest_on_ground() {
        let config = GameConfig::default();
        let mut stone = Stone::spawned("s1", Vec3::new(0.0, 5.0, 0.0));
        let ticks = run_until_static(&mut stone, &config, 2_000);

        assert!(ticks < 2_000);
        assert!(stone.is_static);
        assert_eq!(stone.velocity, Vec3::ZERO);
        assert!((stone.position.y - config.stone.radius).abs() < 1e-5);
    }

    #[test]
    fn test_still_stone_in_the_air_keeps_falling() {
        let config = GameConfig::default();
        let terrain = FlatTerrain::new(0.0);
        let mut stone = Stone::spawned("s1", Vec3::new(0.0, 10.0, 0.0));
        stone.is_thrown = true;
        stone.velocity = Vec3::new(0.0, config.stone.gravity * DT, 0.0);

        let step = step_stone(&mut stone, &terrain, &config.world, &config.stone, DT);
        assert_eq!(step, StoneStep::Moved);
        assert!(stone.velocity.all_below(config.stone.static_epsilon));
        assert!(!stone.is_static);

        let ticks = run_until_static(&mut stone, &config, 2_000);
        assert!(ticks < 2_000);
        assert!((stone.position.y - config.stone.radius).abs() < 1e-5);
    }

    #[test]
    fn test_static_stone_is_not_integrated() {
        let config = GameConfig::default();
        let terrain = FlatTerrain::new(0.0);
        let mut stone = Stone::spawned("s1", Vec3::new(1.0, 0.3, 1.0));
        stone.is_static = true;
        let before = stone.clone();
        let step = step_stone(&mut stone, &terrain, &config.world, &config.stone, DT);
        assert_eq!(step, StoneStep::Skipped);
        assert_eq!(stone, before);
    }

    #[test]
    fn test_held_stone_is_not_integrated() {
        let config = GameConfig::default();
        let terrain = FlatTerrain::new(0.0);
        let mut stone = Stone::spawned("s1", Vec3::new(1.0, 10.0, 1.0));
        stone.hold("p1");
        assert_eq!(
            step_stone(&mut stone, &terrain, &config.world, &config.stone, DT),
            StoneStep::Skipped
        );
        assert_eq!(stone.position.y, 10.0);
    }

    #[test]
    fn test_fast_landing_bounces() {
        let config = GameConfig::default();
        let terrain = FlatTerrain::new(0.0);
        let mut stone = Stone::spawned("s1", Vec3::new(0.0, 0.31, 0.0));
        stone.velocity = Vec3::new(0.0, -8.0, 0.0);
        step_stone(&mut stone, &terrain, &config.world, &config.stone, DT);
        assert!(stone.velocity.y > 3.0);
        assert!(!stone.is_static);
    }

    #[test]
    fn test_thrown_stone_lands_ahead() {
        let config = GameConfig::default();
        let mut stone = Stone::spawned("s1", Vec3::ZERO);
        stone.hold("p1");
        stone.throw(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 5.0, -10.0));
        run_until_static(&mut stone, &config, 5_000);

        assert!(stone.is_static);
        assert!(stone.is_thrown);
        assert!(stone.position.z < -5.0);
        assert!(stone.position.x.abs() < 1e-4);
    }

    #[test]
    fn test_water_pushes_stone_home() {
        let config = GameConfig::default();
        let terrain = FlatTerrain::new(0.0);
        let mut stone = Stone::spawned("s1", Vec3::new(95.0, 0.3, 0.0));
        assert!(in_water(stone.position, &config.world, &config.stone));
        for _ in 0..60 {
            step_stone(&mut stone, &terrain, &config.world, &config.stone, DT);
        }
        assert!(stone.velocity.x < 0.0);
        assert!(stone.position.x < 95.0);
    }

    #[test]
    fn test_submerged_stone_floats_up() {
        let config = GameConfig::default();
        let seabed = FlatTerrain::new(-5.0);
        let mut stone = Stone::spawned("s1", Vec3::new(0.0, -4.7, 0.0));
        for _ in 0..120 {
            step_stone(&mut stone, &seabed, &config.world, &config.stone, DT);
        }
        assert!(stone.position.y > -4.0);
        assert!(!stone.is_static);
    }

    #[test]
    fn test_carry_stacks_above_holder() {
        let config = GameConfig::default();
        let mut players = Collection::new();
        let mut stones = Collection::new();
        let mut player = Player::new("p1", "ana", Vec3::new(2.0, 1.0, 3.0));
        player.held_stones = vec!["a".into(), "b".into()];
        players.insert(player);
        for id in ["a", "b"] {
            let mut stone = Stone::spawned(id, Vec3::ZERO);
            stone.hold("p1");
            stones.insert(stone);
        }

        let moved = carry_held(&players, &mut stones, &config.player);
        assert_eq!(moved.len(), 2);
        let a = stones.get("a").unwrap().position;
        let b = stones.get("b").unwrap().position;
        assert_eq!((a.x, a.z), (2.0, 3.0));
        assert!(b.y > a.y);
    }
}
