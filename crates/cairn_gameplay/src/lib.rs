//! # Cairn Gameplay
//!
//! Deterministic tick simulation over a [`cairn_core::EntityStore`].
//!
//! ## Modules
//!
//! - [`physics`]: Motion Integrator (player, stones, remote interpolation)
//! - [`gameplay`]: Transformation Engine, Hazard Sequencer, stone actions
//! - [`simulation`]: the per-tick step shared by server and client
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cairn_core::{EntityStore, FlatTerrain, GameConfig};
//! use cairn_gameplay::{Authority, Simulation};
//!
//! let mut sim = Simulation::new(GameConfig::default(), Arc::new(FlatTerrain::new(0.0)));
//! let mut store = EntityStore::new();
//! let report = sim.step(&mut store, Authority::Authoritative, 1.0 / 60.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod gameplay;
pub mod ids;
pub mod physics;
pub mod simulation;

pub use gameplay::{HazardEvent, HazardSequencer, TowerChange, TowerChangeKind, TransformationEngine};
pub use ids::IdGenerator;
pub use physics::{PlayerInput, RemoteInterpolator};
pub use simulation::{Authority, Simulation, StepReport};
