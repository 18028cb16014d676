//! # Cairn Core
//!
//! The Entity Store and everything the simulation needs to read or write it.
//!
//! ## Architecture Rules
//!
//! 1. **No ambient globals** - the store is an explicit value passed by reference
//! 2. **Slices, not the world** - subsystems borrow only the collections they touch
//! 3. **Deterministic iteration** - collections are ordered by id
//!
//! ## Example
//!
//! ```rust,ignore
//! use cairn_core::{EntityStore, Stone};
//! use cairn_shared::Vec3;
//!
//! let mut store = EntityStore::new();
//! store.stones.insert(Stone::spawned("stone-1", Vec3::new(0.0, 5.0, 0.0)));
//! for event in store.drain_events() {
//!     // hand to the renderer
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod store;
pub mod terrain;

pub use config::{
    CloudConfig, GameConfig, NetworkConfig, PlayerConfig, ServerConfig, StoneConfig, TowerConfig,
    WorldConfig,
};
pub use entity::{Cloud, Entity, EntityKind, Player, Stone, Tower};
pub use error::{ConfigError, ConfigResult};
pub use events::{ChangeKind, ChannelObserver, EntityEvent, EntityObserver};
pub use store::{Collection, EntityStore, StoreSlices};
pub use terrain::{FlatTerrain, HeightGrid, TerrainHeight};
