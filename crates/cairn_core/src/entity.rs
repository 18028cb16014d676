//! # Entity Records
//!
//! Plain data for the four entity kinds. Behaviour lives in `cairn_gameplay`;
//! the only logic here is the stone hand-off transitions, because they carry
//! the `held`/`thrown` exclusivity invariant and must never be split.

use cairn_shared::{CloudPhase, CloudState, PlayerState, StoneState, TowerState, Vec2, Vec3};

/// Kind discriminator used by lifecycle events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// A player avatar.
    Player,
    /// A throwable stone.
    Stone,
    /// A stacked tower.
    Tower,
    /// A cloud hazard.
    Cloud,
}

impl EntityKind {
    /// Lowercase name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Stone => "stone",
            Self::Tower => "tower",
            Self::Cloud => "cloud",
        }
    }
}

/// Common surface of stored entities.
pub trait Entity {
    /// Kind of every value of this type.
    const KIND: EntityKind;

    /// Stable id.
    fn id(&self) -> &str;

    /// Replaces the id (used when the server reassigns a player id).
    fn set_id(&mut self, id: String);
}

// ============================================================================
// PLAYER
// ============================================================================

/// A player avatar.
///
/// `move_speed`, `turn_speed`, `vertical_velocity` and the flags are local
/// physics scratch state: never sent, never taken from the server.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    /// Stable id.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Position (terrain + base height when standing).
    pub position: Vec3,
    /// Euler rotation, `x` = pitch, `y` = yaw (heading).
    pub rotation: Vec3,
    /// Forward speed in units per tick (negative = backwards).
    pub move_speed: f32,
    /// Heading change in radians per tick.
    pub turn_speed: f32,
    /// Vertical velocity in units per tick while airborne.
    pub vertical_velocity: f32,
    /// Carried stones, bottom of the stack first.
    pub held_stones: Vec<String>,
    /// Standing on terrain or a tower.
    pub is_grounded: bool,
    /// In the air after a jump.
    pub is_jumping: bool,
    /// Inside a tower's climb radius.
    pub is_climbing: bool,
    /// Seconds since climbing started.
    pub climb_elapsed: f32,
    /// Height at which climbing started.
    pub climb_start_y: f32,
}

impl Player {
    /// Creates a grounded, motionless player.
    #[must_use]
    pub fn new(id: impl Into<String>, username: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            position,
            rotation: Vec3::ZERO,
            move_speed: 0.0,
            turn_speed: 0.0,
            vertical_velocity: 0.0,
            held_stones: Vec::new(),
            is_grounded: true,
            is_jumping: false,
            is_climbing: false,
            climb_elapsed: 0.0,
            climb_start_y: position.y,
        }
    }

    /// Heading in radians.
    #[must_use]
    pub fn heading(&self) -> f32 {
        self.rotation.y
    }

    /// Unit forward direction on the ground plane for the current heading.
    #[must_use]
    pub fn forward(&self) -> Vec2 {
        let heading = self.heading();
        Vec2::new(-heading.sin(), -heading.cos())
    }

    /// Wire form.
    #[must_use]
    pub fn to_state(&self) -> PlayerState {
        PlayerState {
            player_id: self.id.clone(),
            username: self.username.clone(),
            position: self.position,
            rotation: self.rotation,
            held_stones: self.held_stones.clone(),
        }
    }

    /// Reconstructs a player from its wire form with fresh scratch state.
    #[must_use]
    pub fn from_state(state: PlayerState) -> Self {
        let mut player = Self::new(state.player_id, state.username, state.position);
        player.rotation = state.rotation;
        player.held_stones = state.held_stones;
        player
    }
}

impl Entity for Player {
    const KIND: EntityKind = EntityKind::Player;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

// ============================================================================
// STONE
// ============================================================================

/// A throwable stone.
///
/// Invariant: `is_held` and `is_thrown` are never both true. Use the
/// transition methods rather than writing the flags directly.
#[derive(Clone, Debug, PartialEq)]
pub struct Stone {
    /// Stable id.
    pub id: String,
    /// Centre position.
    pub position: Vec3,
    /// Velocity in units per second.
    pub velocity: Vec3,
    /// Carried by a player.
    pub is_held: bool,
    /// Holder back-reference (lookup only).
    pub held_by: Option<String>,
    /// Released by a throw.
    pub is_thrown: bool,
    /// Player who released the last throw (local only).
    pub thrown_by: Option<String>,
    /// Seconds since the last throw.
    pub since_throw: f32,
    /// At rest; skipped by the integrator until thrown again.
    pub is_static: bool,
}

impl Stone {
    /// A free stone that will fall and settle.
    #[must_use]
    pub fn spawned(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            velocity: Vec3::ZERO,
            is_held: false,
            held_by: None,
            is_thrown: false,
            thrown_by: None,
            since_throw: 0.0,
            is_static: false,
        }
    }

    /// Hands the stone to `player_id`. Clears thrown/static state.
    pub fn hold(&mut self, player_id: impl Into<String>) {
        self.is_held = true;
        self.held_by = Some(player_id.into());
        self.is_thrown = false;
        self.is_static = false;
        self.since_throw = 0.0;
        self.velocity = Vec3::ZERO;
    }

    /// Releases the stone as a projectile. Re-arms the settle timer.
    pub fn throw(&mut self, position: Vec3, velocity: Vec3) {
        self.thrown_by = self.held_by.take();
        self.is_held = false;
        self.is_thrown = true;
        self.is_static = false;
        self.since_throw = 0.0;
        self.position = position;
        self.velocity = velocity;
    }

    /// Lets go without throwing (holder left the world).
    pub fn drop_loose(&mut self) {
        self.is_held = false;
        self.held_by = None;
        self.is_thrown = false;
        self.is_static = false;
        self.velocity = Vec3::ZERO;
    }

    /// True if the integrator should move this stone.
    #[must_use]
    pub const fn is_simulated(&self) -> bool {
        !self.is_held && !self.is_static
    }

    /// Wire form.
    #[must_use]
    pub fn to_state(&self) -> StoneState {
        StoneState {
            id: self.id.clone(),
            position: self.position,
            velocity: self.velocity,
            is_static: self.is_static,
            is_held: self.is_held,
            held_by: self.held_by.clone(),
            is_thrown: self.is_thrown,
        }
    }

    /// Reconstructs a stone from its wire form.
    #[must_use]
    pub fn from_state(state: StoneState) -> Self {
        let mut stone = Self::spawned(state.id.clone(), state.position);
        stone.apply_state(state);
        stone
    }

    /// Overwrites the shared fields with authoritative values.
    ///
    /// A record claiming both held and thrown is normalised to held.
    pub fn apply_state(&mut self, state: StoneState) {
        if self.is_held && state.is_thrown && !state.is_held {
            self.thrown_by = self.held_by.clone();
        }
        if !self.is_thrown && state.is_thrown {
            self.since_throw = 0.0;
        }
        self.position = state.position;
        self.velocity = state.velocity;
        self.is_static = state.is_static && !state.is_held;
        self.is_held = state.is_held;
        self.held_by = if state.is_held { state.held_by } else { None };
        self.is_thrown = state.is_thrown && !state.is_held;
    }
}

impl Entity for Stone {
    const KIND: EntityKind = EntityKind::Stone;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

// ============================================================================
// TOWER
// ============================================================================

/// A stacked tower.
#[derive(Clone, Debug, PartialEq)]
pub struct Tower {
    /// Stable id.
    pub id: String,
    /// Base centre, fixed at creation.
    pub position: Vec3,
    /// Number of blocks (>= 1).
    pub level: u32,
    /// Founding player.
    pub created_by: Option<String>,
    /// World clock seconds at creation.
    pub created_at: f64,
}

impl Tower {
    /// A level-1 tower.
    #[must_use]
    pub fn founded(
        id: impl Into<String>,
        position: Vec3,
        created_by: Option<String>,
        created_at: f64,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            level: 1,
            created_by,
            created_at,
        }
    }

    /// Height of the top face.
    #[must_use]
    pub fn top(&self, block_height: f32) -> f32 {
        self.position.y + self.level as f32 * block_height
    }

    /// Wire form.
    #[must_use]
    pub fn to_state(&self) -> TowerState {
        TowerState {
            id: self.id.clone(),
            position: self.position,
            level: self.level,
            created_by: self.created_by.clone(),
            created_at: self.created_at,
        }
    }

    /// Reconstructs a tower from its wire form. Level is floored at 1.
    #[must_use]
    pub fn from_state(state: TowerState) -> Self {
        Self {
            id: state.id,
            position: state.position,
            level: state.level.max(1),
            created_by: state.created_by,
            created_at: state.created_at,
        }
    }
}

impl Entity for Tower {
    const KIND: EntityKind = EntityKind::Tower;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

// ============================================================================
// CLOUD
// ============================================================================

/// A cloud hazard.
#[derive(Clone, Debug, PartialEq)]
pub struct Cloud {
    /// Stable id.
    pub id: String,
    /// Position; height is cosmetic.
    pub position: Vec3,
    /// Unit drift direction.
    pub direction: Vec2,
    /// Drift speed in units per second.
    pub speed: f32,
    /// Current phase.
    pub phase: CloudPhase,
    /// Seconds spent in the current phase.
    pub phase_elapsed: f32,
    /// Tower under attack (raining/flooding only).
    pub target_tower_id: Option<String>,
}

impl Cloud {
    /// An idle cloud.
    #[must_use]
    pub fn new(id: impl Into<String>, position: Vec3, direction: Vec2, speed: f32) -> Self {
        Self {
            id: id.into(),
            position,
            direction: direction.normalized(),
            speed,
            phase: CloudPhase::Idle,
            phase_elapsed: 0.0,
            target_tower_id: None,
        }
    }

    /// Wire form.
    #[must_use]
    pub fn to_state(&self) -> CloudState {
        CloudState {
            id: self.id.clone(),
            position: self.position,
            direction: self.direction,
            speed: self.speed,
            phase: self.phase,
            target_tower_id: self.target_tower_id.clone(),
        }
    }

    /// Reconstructs a cloud from its wire form.
    #[must_use]
    pub fn from_state(state: CloudState) -> Self {
        let mut cloud = Self::new(state.id.clone(), state.position, state.direction, state.speed);
        cloud.apply_state(state);
        cloud
    }

    /// Overwrites shared fields with authoritative values.
    pub fn apply_state(&mut self, state: CloudState) {
        if state.phase != self.phase {
            self.phase_elapsed = 0.0;
        }
        self.position = state.position;
        self.direction = state.direction.normalized();
        self.speed = state.speed;
        self.phase = state.phase;
        self.target_tower_id = if state.phase.is_attacking() {
            state.target_tower_id
        } else {
            None
        };
    }
}

impl Entity for Cloud {
    const KIND: EntityKind = EntityKind::Cloud;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stone_transitions_keep_exclusivity() {
        let mut stone = Stone::spawned("s1", Vec3::new(0.0, 1.0, 0.0));
        stone.hold("p1");
        assert!(stone.is_held && !stone.is_thrown);

        stone.throw(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 5.0, -10.0));
        assert!(!stone.is_held && stone.is_thrown);
        assert!(stone.held_by.is_none());
        assert_eq!(stone.thrown_by.as_deref(), Some("p1"));

        stone.hold("p2");
        assert!(stone.is_held && !stone.is_thrown);
        assert_eq!(stone.held_by.as_deref(), Some("p2"));
    }

    #[test]
    fn test_stone_state_normalises_conflicting_flags() {
        let mut stone = Stone::spawned("s1", Vec3::ZERO);
        stone.apply_state(StoneState {
            id: "s1".into(),
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            is_static: true,
            is_held: true,
            held_by: Some("p1".into()),
            is_thrown: true,
        });
        assert!(stone.is_held);
        assert!(!stone.is_thrown);
        assert!(!stone.is_static);
    }

    #[test]
    fn test_player_round_trip_through_wire_form() {
        let mut player = Player::new("p1", "ana", Vec3::new(1.0, 2.0, 3.0));
        player.rotation = Vec3::new(0.1, 1.2, 0.0);
        player.held_stones = vec!["s1".into(), "s2".into()];
        player.move_speed = 0.4;

        let back = Player::from_state(player.to_state());
        assert_eq!(back.id, player.id);
        assert_eq!(back.position, player.position);
        assert_eq!(back.rotation, player.rotation);
        assert_eq!(back.held_stones, player.held_stones);
        // scratch state is never transmitted
        assert_eq!(back.move_speed, 0.0);
    }

    #[test]
    fn test_stone_round_trip_through_wire_form() {
        let mut held = Stone::spawned("s1", Vec3::new(1.0, 3.0, -2.0));
        held.is_held = true;
        held.held_by = Some("p1".into());
        let back = Stone::from_state(held.to_state());
        assert_eq!(back.id, "s1");
        assert_eq!(back.position, held.position);
        assert!(back.is_held && !back.is_thrown && !back.is_static);
        assert_eq!(back.held_by.as_deref(), Some("p1"));

        let mut flying = Stone::spawned("s2", Vec3::new(0.0, 2.0, 0.0));
        flying.is_thrown = true;
        flying.velocity = Vec3::new(0.0, 5.0, -10.0);
        let back = Stone::from_state(flying.to_state());
        assert_eq!(back.velocity, flying.velocity);
        assert!(back.is_thrown && !back.is_held && !back.is_static);
        assert!(back.held_by.is_none());

        let mut resting = Stone::spawned("s3", Vec3::new(4.0, 0.3, 4.0));
        resting.is_static = true;
        let back = Stone::from_state(resting.to_state());
        assert!(back.is_static && !back.is_thrown && !back.is_held);
    }

    #[test]
    fn test_tower_top() {
        let mut tower = Tower::founded("t1", Vec3::new(0.0, 2.0, 0.0), None, 0.0);
        assert!((tower.top(1.5) - 3.5).abs() < 1e-6);
        tower.level = 3;
        assert!((tower.top(1.5) - 6.5).abs() < 1e-6);
    }

    #[test]
    fn test_cloud_target_cleared_outside_attack_phases() {
        let mut cloud = Cloud::new("c1", Vec3::ZERO, Vec2::X, 3.0);
        let mut state = cloud.to_state();
        state.phase = CloudPhase::Moving;
        state.target_tower_id = Some("t1".into());
        cloud.apply_state(state);
        assert!(cloud.target_tower_id.is_none());
    }
}
