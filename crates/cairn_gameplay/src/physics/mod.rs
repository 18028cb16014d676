//! # Motion Integrator
//!
//! - [`player`]: owning-client player model (per tick)
//! - [`stone`]: stone ballistics with water and ground interaction (per `dt`)
//! - [`remote`]: interpolation of remote players toward received poses

pub mod player;
pub mod remote;
pub mod stone;

pub use player::{
    approach, clamp_to_disk, climbable_tower, is_standing_on, step_player, tower_standing_height,
    PlayerEnv, PlayerInput,
};
pub use remote::RemoteInterpolator;
pub use stone::{carried_position, carry_held, in_water, step_stone, StoneStep};
