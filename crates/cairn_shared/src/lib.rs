//! # Cairn Shared
//!
//! Common types used by both client and server.
//!
//! ## CRITICAL RULE
//!
//! This crate carries only plain data: math, constants and the wire protocol.
//! Simulation lives in `cairn_gameplay`, transport in `cairn_networking`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;
pub mod protocol;

pub use constants::{DEFAULT_SERVER_ADDR, DEFAULT_TICK_RATE, LIVENESS_TIMEOUT_SECS, MAX_HELD_STONES};
pub use math::{Vec2, Vec3};
pub use protocol::{
    ClientMessage, CloudPhase, CloudState, PlayerState, ServerMessage, StoneState, TowerState,
    WorldState,
};
