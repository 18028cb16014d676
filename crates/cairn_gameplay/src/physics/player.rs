//! # Player Motion
//!
//! Kinematic model for the locally owned player. Speeds accelerate and
//! decelerate by fixed steps per tick; height follows the terrain (or a
//! tower being climbed) through exponential smoothing, except while airborne
//! after a jump.

use cairn_core::{Collection, Player, PlayerConfig, TerrainHeight, Tower, TowerConfig, WorldConfig};
use cairn_shared::Vec3;

/// Held inputs for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerInput {
    /// Move forward.
    pub forward: bool,
    /// Move backward.
    pub backward: bool,
    /// Turn left (heading increases).
    pub turn_left: bool,
    /// Turn right (heading decreases).
    pub turn_right: bool,
    /// Raise the speed cap.
    pub sprint: bool,
    /// Jump if grounded.
    pub jump: bool,
}

impl PlayerInput {
    /// -1, 0 or +1 for the move axis.
    #[must_use]
    pub fn move_axis(&self) -> f32 {
        axis(self.forward, self.backward)
    }

    /// -1, 0 or +1 for the turn axis.
    #[must_use]
    pub fn turn_axis(&self) -> f32 {
        axis(self.turn_left, self.turn_right)
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

/// Moves `current` toward `target` by at most `step`, never past it.
#[must_use]
pub fn approach(current: f32, target: f32, step: f32) -> f32 {
    if current < target {
        (current + step).min(target)
    } else {
        (current - step).max(target)
    }
}

/// Everything the player model reads besides the player itself.
pub struct PlayerEnv<'a> {
    /// Player tuning.
    pub player: &'a PlayerConfig,
    /// Tower geometry.
    pub tower: &'a TowerConfig,
    /// World geometry.
    pub world: &'a WorldConfig,
    /// Ground heights.
    pub terrain: &'a dyn TerrainHeight,
    /// Towers the player may climb.
    pub towers: &'a Collection<Tower>,
}

/// Advances one player by one tick.
pub fn step_player(player: &mut Player, input: &PlayerInput, env: &PlayerEnv<'_>, dt: f32) {
    let cfg = env.player;

    // Turning
    let turn = input.turn_axis();
    player.turn_speed = if turn == 0.0 {
        approach(player.turn_speed, 0.0, cfg.turn_deceleration)
    } else {
        approach(player.turn_speed, turn * cfg.max_turn_speed, cfg.turn_acceleration)
    };

    // Forward motion
    let movement = input.move_axis();
    player.move_speed = if movement == 0.0 {
        approach(player.move_speed, 0.0, cfg.move_deceleration)
    } else {
        let cap = if input.sprint {
            cfg.max_move_speed * cfg.sprint_multiplier
        } else {
            cfg.max_move_speed
        };
        approach(player.move_speed, movement * cap, cfg.move_acceleration)
    };

    player.rotation.y += player.turn_speed;
    let forward = player.forward();
    player.position.x += forward.x * player.move_speed;
    player.position.z += forward.z * player.move_speed;
    clamp_to_disk(&mut player.position, cfg.boundary_factor * env.world.half_size());

    // Jump
    if input.jump && player.is_grounded && !player.is_jumping {
        player.vertical_velocity = cfg.jump_impulse;
        player.is_jumping = true;
        player.is_grounded = false;
    }

    let rest = resting_height(player, env, dt);

    if player.is_jumping {
        player.vertical_velocity -= cfg.gravity;
        player.position.y += player.vertical_velocity;
        if player.position.y <= rest {
            player.position.y = rest;
            player.vertical_velocity = 0.0;
            player.is_jumping = false;
            player.is_grounded = true;
        }
    } else {
        player.position.y += (rest - player.position.y) * cfg.height_smoothing;
        player.is_grounded = true;
    }
}

/// Clamps the horizontal position to a disk of `radius` around the origin.
///
/// Returns `true` if the position was moved.
pub fn clamp_to_disk(position: &mut Vec3, radius: f32) -> bool {
    let dist = position.horizontal_length();
    if dist > radius && dist > 0.0 {
        let scale = radius / dist;
        position.x *= scale;
        position.z *= scale;
        true
    } else {
        false
    }
}

/// Nearest tower whose climb radius contains `position` horizontally.
#[must_use]
pub fn climbable_tower<'a>(
    position: Vec3,
    towers: &'a Collection<Tower>,
    tower_cfg: &TowerConfig,
) -> Option<&'a Tower> {
    let reach = tower_cfg.climb_radius();
    towers
        .iter()
        .map(|tower| (tower, tower.position.horizontal_distance(position)))
        .filter(|(_, dist)| *dist <= reach)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(tower, _)| tower)
}

/// Height a player stands at on top of `tower`.
#[must_use]
pub fn tower_standing_height(tower: &Tower, tower_cfg: &TowerConfig, player_cfg: &PlayerConfig) -> f32 {
    tower.top(tower_cfg.block_height) + player_cfg.base_height
}

/// True if a player at `position` is standing on `tower` (within the climb
/// radius and at least half a block above its top).
#[must_use]
pub fn is_standing_on(
    position: Vec3,
    tower: &Tower,
    tower_cfg: &TowerConfig,
    player_cfg: &PlayerConfig,
) -> bool {
    position.horizontal_distance(tower.position) <= tower_cfg.climb_radius()
        && position.y >= tower_standing_height(tower, tower_cfg, player_cfg) - tower_cfg.block_height * 0.5
}

/// Resting height for this tick; updates the climb state.
fn resting_height(player: &mut Player, env: &PlayerEnv<'_>, dt: f32) -> f32 {
    match climbable_tower(player.position, env.towers, env.tower) {
        Some(tower) => {
            if !player.is_climbing {
                player.is_climbing = true;
                player.climb_elapsed = 0.0;
                player.climb_start_y = player.position.y;
            }
            player.climb_elapsed += dt;
            let top = tower_standing_height(tower, env.tower, env.player);
            let climbed = player.climb_start_y + env.player.climb_rate * player.climb_elapsed;
            climbed.min(top)
        }
        None => {
            player.is_climbing = false;
            player.climb_elapsed = 0.0;
            env.terrain.height_at(player.position.x, player.position.z) + env.player.base_height
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::{FlatTerrain, GameConfig};

    const DT: f32 = 1.0 / 60.0;

    struct Fixture {
        config: GameConfig,
        terrain: FlatTerrain,
        towers: Collection<Tower>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: GameConfig::default(),
                terrain: FlatTerrain::new(0.0),
                towers: Collection::new(),
            }
        }

        fn step(&self, player: &mut Player, input: PlayerInput, ticks: usize) {
            let env = PlayerEnv {
                player: &self.config.player,
                tower: &self.config.tower,
                world: &self.config.world,
                terrain: &self.terrain,
                towers: &self.towers,
            };
            for _ in 0..ticks {
                step_player(player, &input, &env, DT);
            }
        }
    }

    fn standing_player() -> Player {
        Player::new("p1", "ana", Vec3::new(0.0, 1.0, 0.0))
    }

    #[test]
    fn test_approach_never_overshoots() {
        assert_eq!(approach(0.0, 0.15, 0.1), 0.1);
        assert_eq!(approach(0.1, 0.15, 0.1), 0.15);
        assert_eq!(approach(0.01, 0.0, 0.02), 0.0);
        assert_eq!(approach(-0.01, 0.0, 0.02), 0.0);
    }

    #[test]
    fn test_forward_accelerates_to_cap_and_moves_along_heading() {
        let fx = Fixture::new();
        let mut player = standing_player();
        let input = PlayerInput {
            forward: true,
            ..PlayerInput::default()
        };
        fx.step(&mut player, input, 100);

        assert!((player.move_speed - fx.config.player.max_move_speed).abs() < 1e-6);
        // heading 0 moves toward -z
        assert!(player.position.z < -5.0);
        assert!(player.position.x.abs() < 1e-4);
    }

    #[test]
    fn test_sprint_raises_cap() {
        let fx = Fixture::new();
        let mut player = standing_player();
        let input = PlayerInput {
            forward: true,
            sprint: true,
            ..PlayerInput::default()
        };
        fx.step(&mut player, input, 200);
        let expected = fx.config.player.max_move_speed * fx.config.player.sprint_multiplier;
        assert!((player.move_speed - expected).abs() < 1e-6);
    }

    #[test]
    fn test_release_decelerates_to_zero() {
        let fx = Fixture::new();
        let mut player = standing_player();
        player.move_speed = 0.15;
        player.turn_speed = -0.05;
        fx.step(&mut player, PlayerInput::default(), 20);
        assert_eq!(player.move_speed, 0.0);
        assert_eq!(player.turn_speed, 0.0);
    }

    #[test]
    fn test_left_turn_increases_heading() {
        let fx = Fixture::new();
        let mut player = standing_player();
        let input = PlayerInput {
            turn_left: true,
            ..PlayerInput::default()
        };
        fx.step(&mut player, input, 30);
        assert!(player.rotation.y > 0.5);
    }

    #[test]
    fn test_boundary_disk() {
        let fx = Fixture::new();
        let mut player = standing_player();
        player.position = Vec3::new(0.0, 1.0, -94.9);
        player.move_speed = 0.15;
        let input = PlayerInput {
            forward: true,
            ..PlayerInput::default()
        };
        fx.step(&mut player, input, 60);
        let limit = fx.config.player.boundary_factor * fx.config.world.half_size();
        assert!(player.position.horizontal_length() <= limit + 1e-3);
    }

    #[test]
    fn test_jump_returns_to_ground() {
        let fx = Fixture::new();
        let mut player = standing_player();
        fx.step(
            &mut player,
            PlayerInput {
                jump: true,
                ..PlayerInput::default()
            },
            1,
        );
        assert!(player.is_jumping);
        assert!(player.position.y > 1.0);

        fx.step(&mut player, PlayerInput::default(), 120);
        assert!(!player.is_jumping);
        assert!(player.is_grounded);
        assert_eq!(player.vertical_velocity, 0.0);
        assert!((player.position.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_no_double_jump() {
        let fx = Fixture::new();
        let mut player = standing_player();
        let jump = PlayerInput {
            jump: true,
            ..PlayerInput::default()
        };
        fx.step(&mut player, jump, 1);
        let v1 = player.vertical_velocity;
        fx.step(&mut player, jump, 1);
        assert!(player.vertical_velocity < v1);
    }

    #[test]
    fn test_height_is_smoothed_not_snapped() {
        let mut fx = Fixture::new();
        fx.terrain = FlatTerrain::new(4.0);
        let mut player = standing_player();
        fx.step(&mut player, PlayerInput::default(), 1);
        assert!(player.position.y > 1.0 && player.position.y < 5.0);
        fx.step(&mut player, PlayerInput::default(), 200);
        assert!((player.position.y - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_climb_is_linear_and_clamped_to_top() {
        let mut fx = Fixture::new();
        let mut tower = Tower::founded("t1", Vec3::ZERO, None, 0.0);
        tower.level = 3;
        fx.towers.insert(tower);

        let mut player = standing_player();
        fx.step(&mut player, PlayerInput::default(), 1);
        assert!(player.is_climbing);

        // after 3 s the climb target is clamped to the top standing height
        fx.step(&mut player, PlayerInput::default(), 240);
        let top = 3.0 * fx.config.tower.block_height + fx.config.player.base_height;
        assert!((player.position.y - top).abs() < 1e-2);

        let t = fx.towers.get("t1").unwrap();
        assert!(is_standing_on(player.position, t, &fx.config.tower, &fx.config.player));
    }

    #[test]
    fn test_leaving_climb_radius_returns_to_terrain_follow() {
        let mut fx = Fixture::new();
        fx.towers.insert(Tower::founded("t1", Vec3::ZERO, None, 0.0));
        let mut player = standing_player();
        fx.step(&mut player, PlayerInput::default(), 60);
        assert!(player.is_climbing);

        player.position.x = 10.0;
        fx.step(&mut player, PlayerInput::default(), 1);
        assert!(!player.is_climbing);
        fx.step(&mut player, PlayerInput::default(), 200);
        assert!((player.position.y - 1.0).abs() < 1e-3);
    }
}
