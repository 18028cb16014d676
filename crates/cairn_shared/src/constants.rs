//! # Protocol Constants
//!
//! Values both ends of the wire must agree on. Gameplay tuning lives in
//! `cairn_core::config` instead, so it can change without a protocol bump.

/// Default server address for clients.
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:7777";

/// Default server bind address (all interfaces).
pub const DEFAULT_SERVER_BIND: &str = "0.0.0.0:7777";

/// Simulation tick rate (ticks per second).
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Maximum number of stones a single player can carry.
pub const MAX_HELD_STONES: usize = 5;

/// Seconds without a `player_update` before a remote player is pruned.
pub const LIVENESS_TIMEOUT_SECS: f32 = 10.0;

/// Upper bound on a single encoded message line (bytes).
///
/// A full `initial_state` for a busy world stays well below this.
pub const MAX_MESSAGE_BYTES: usize = 256 * 1024;
