//! # Gameplay Systems
//!
//! - Transformation Engine: settled stones into towers
//! - Hazard Sequencer: clouds against towers
//! - Player stone actions

pub mod actions;
pub mod hazard;
pub mod transformation;

pub use actions::{pick_up, pick_up_nearest, release_all, throw, throw_held, ThrowRelease};
pub use hazard::{flood_opacity, HazardEvent, HazardSequencer};
pub use transformation::{
    advance_settle_timers, is_eligible, placement, Placement, TowerChange, TowerChangeKind,
    TransformationEngine,
};
