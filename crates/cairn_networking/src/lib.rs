//! # Cairn Networking - Sync Protocol Layer
//!
//! Keeps every participant's [`cairn_core::EntityStore`] converging on the
//! server's.
//!
//! ## Architecture
//!
//! - **Codec**: one JSON object per line, tagged by `type`
//! - **Transport**: TCP on tokio, reconnect with fixed backoff
//! - **Server**: authoritative world, one lock, fixed-rate tick
//! - **Prediction**: the local player moves immediately, corrections blend in
//! - **Sync**: remote interpolation, liveness pruning, broadcast cadence
//!
//! ## Authority Model
//!
//! ```text
//! CLIENT                                SERVER
//!   |                                      |
//!   |--- player_update (20 Hz) ----------->| <- clamps, validates held list
//!   |<-- player_update (relayed) ----------|    to everyone else
//!   |                                      |
//!   |--- throw_stone ---------------------->| <- owns towers and clouds
//!   |<-- tower_created / cloud_update -----|
//!   |                                      |
//! ```
//!
//! Clients predict their own player and thrown stones. Towers, clouds and
//! stone spawning come only from the server.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cairn_core::{FlatTerrain, GameConfig};
//! use cairn_gameplay::Simulation;
//! use cairn_networking::GameServer;
//!
//! let sim = Simulation::new(GameConfig::default(), Arc::new(FlatTerrain::new(0.0)));
//! let server = GameServer::new(sim);
//! let tick_thread = server.spawn_tick_thread()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod codec;
pub mod error;
pub mod prediction;
pub mod server;
pub mod sync;
pub mod transport;

pub use client::{ClientConfig, ClientInput, ClientState, GameClient, ReconnectPolicy, TransportEvent};
pub use error::{DecodeError, NetError, NetResult};
pub use prediction::{ReconciliationResult, Reconciler};
pub use server::{ConnectionHub, ConnectionId, GameServer, Outbound, Recipient, ServerWorld, TickLoop, TickStats};
pub use sync::{Applied, ClientSync, LivenessTracker};
pub use transport::{run_client, serve, spawn_client, TransportStats};
