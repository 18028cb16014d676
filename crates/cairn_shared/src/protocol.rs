//! Network protocol types shared between client and server.
//!
//! Every message is a JSON object with a `type` discriminator and camelCase
//! fields. Both sides decode into a closed enum, so a message kind that one
//! side forgets to handle is a compile error, not a silently ignored string.
//!
//! ```text
//! {"type":"player_update","playerId":"p7","username":"ana",
//!  "position":{"x":1.0,"y":2.0,"z":3.0},"rotation":{"x":0.0,"y":1.5,"z":0.0},
//!  "heldStones":["stone-4"]}
//! ```

use crate::math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

// =============================================================================
// ENTITY WIRE RECORDS
// =============================================================================

/// Wire form of a player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Stable player id.
    pub player_id: String,
    /// Display name (empty when the sender omits it).
    #[serde(default)]
    pub username: String,
    /// Position (feet + base height).
    pub position: Vec3,
    /// Euler rotation, `x` = pitch, `y` = yaw.
    pub rotation: Vec3,
    /// Ids of carried stones, bottom of the stack first.
    #[serde(default)]
    pub held_stones: Vec<String>,
}

/// Wire form of a stone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoneState {
    /// Stone id.
    pub id: String,
    /// Centre position.
    pub position: Vec3,
    /// Velocity in units per second.
    pub velocity: Vec3,
    /// At rest and no longer simulated.
    #[serde(default)]
    pub is_static: bool,
    /// Carried by a player.
    #[serde(default)]
    pub is_held: bool,
    /// Holder back-reference.
    #[serde(default)]
    pub held_by: Option<String>,
    /// Released by a throw and not yet consumed.
    #[serde(default)]
    pub is_thrown: bool,
}

/// Wire form of a tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerState {
    /// Tower id.
    pub id: String,
    /// Base centre.
    pub position: Vec3,
    /// Number of stacked blocks (>= 1).
    pub level: u32,
    /// Player whose stone founded the tower.
    #[serde(default)]
    pub created_by: Option<String>,
    /// World clock seconds at creation.
    #[serde(default)]
    pub created_at: f64,
}

/// Phase of a cloud hazard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudPhase {
    /// Drifting, not yet allowed to target.
    #[default]
    Idle,
    /// Drifting and scanning for towers with players on top.
    Moving,
    /// Raining on the target tower.
    Raining,
    /// Flood ring expanding around the target tower.
    Flooding,
}

impl CloudPhase {
    /// The phase that strictly follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Idle => Self::Moving,
            Self::Moving => Self::Raining,
            Self::Raining => Self::Flooding,
            Self::Flooding => Self::Idle,
        }
    }

    /// True while a tower may be targeted.
    #[must_use]
    pub const fn is_attacking(self) -> bool {
        matches!(self, Self::Raining | Self::Flooding)
    }
}

/// Wire form of a cloud.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudState {
    /// Cloud id.
    pub id: String,
    /// Position (height is cosmetic).
    pub position: Vec3,
    /// Unit drift direction on the ground plane.
    pub direction: Vec2,
    /// Drift speed in units per second.
    pub speed: f32,
    /// Current phase.
    pub phase: CloudPhase,
    /// Tower under attack.
    #[serde(default)]
    pub target_tower_id: Option<String>,
}

/// Full snapshot sent in `initial_state`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// All players.
    #[serde(default)]
    pub players: Vec<PlayerState>,
    /// All stones.
    #[serde(default)]
    pub stones: Vec<StoneState>,
    /// All towers.
    #[serde(default)]
    pub towers: Vec<TowerState>,
    /// All clouds.
    #[serde(default)]
    pub clouds: Vec<CloudState>,
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Messages sent by clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// First message on a fresh connection.
    Join {
        /// Id the client would like to keep.
        player_id: String,
        /// Display name.
        username: String,
        /// Spawn position.
        position: Vec3,
        /// Spawn rotation.
        rotation: Vec3,
    },
    /// Asks for a full `initial_state`.
    RequestState,
    /// Periodic pose broadcast of the sender's own player.
    PlayerUpdate(PlayerState),
    /// Grab a free stone.
    PickUpStone {
        /// Acting player.
        player_id: String,
        /// Stone to grab.
        stone_id: String,
    },
    /// Release a held stone with a launch velocity.
    ThrowStone {
        /// Acting player.
        player_id: String,
        /// Stone being thrown.
        stone_id: String,
        /// Release position.
        position: Vec3,
        /// Launch velocity.
        velocity: Vec3,
    },
    /// Player-triggered demolition.
    TowerDestroyed {
        /// Tower to remove.
        tower_id: String,
        /// Acting player.
        actor_id: String,
    },
    /// Graceful disconnect.
    Leave {
        /// Leaving player.
        player_id: String,
    },
}

impl ClientMessage {
    /// Wire discriminator, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::RequestState => "request_state",
            Self::PlayerUpdate(_) => "player_update",
            Self::PickUpStone { .. } => "pick_up_stone",
            Self::ThrowStone { .. } => "throw_stone",
            Self::TowerDestroyed { .. } => "tower_destroyed",
            Self::Leave { .. } => "leave",
        }
    }
}

/// Messages sent by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Reply to `join`.
    Welcome {
        /// Id the server assigned (usually the requested one).
        player_id: String,
        /// Players already in the world.
        players: Vec<PlayerState>,
    },
    /// Someone else joined.
    PlayerJoined(PlayerState),
    /// Someone left or timed out.
    PlayerLeft {
        /// Departed player.
        player_id: String,
    },
    /// Relayed pose of another player.
    PlayerUpdate(PlayerState),
    /// Authoritative correction of the receiver's own player.
    PlayerCorrection {
        /// Receiver's player id.
        player_id: String,
        /// Authoritative position.
        position: Vec3,
        /// Authoritative carried stones.
        held_stones: Vec<String>,
    },
    /// Reply to `request_state`.
    InitialState(WorldState),
    /// New stone in the world.
    StoneSpawned(StoneState),
    /// Stone moved or changed hands.
    StoneUpdate(StoneState),
    /// Stone consumed.
    StoneRemoved {
        /// Removed stone.
        stone_id: String,
    },
    /// Tower founded or raised (full record).
    TowerCreated(TowerState),
    /// Tower record refresh. Applied exactly like `tower_created`.
    TowerUpdate(TowerState),
    /// Tower demolished whole.
    TowerDestroyed {
        /// Removed tower.
        tower_id: String,
        /// Player or cloud that caused it.
        actor_id: Option<String>,
    },
    /// Cloud moved or changed phase.
    CloudUpdate(CloudState),
}

impl ServerMessage {
    /// Wire discriminator, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::PlayerJoined(_) => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::PlayerUpdate(_) => "player_update",
            Self::PlayerCorrection { .. } => "player_correction",
            Self::InitialState(_) => "initial_state",
            Self::StoneSpawned(_) => "stone_spawned",
            Self::StoneUpdate(_) => "stone_update",
            Self::StoneRemoved { .. } => "stone_removed",
            Self::TowerCreated(_) => "tower_created",
            Self::TowerUpdate(_) => "tower_update",
            Self::TowerDestroyed { .. } => "tower_destroyed",
            Self::CloudUpdate(_) => "cloud_update",
        }
    }
}
