//! # Client-Side Prediction
//!
//! The local player moves immediately on input. When the server disagrees
//! about where it is, the [`Reconciler`] pulls the predicted position back.
//!
//! ## Reconciliation
//!
//! ```text
//! server says:  S           error = |S - P|
//! we predicted: P
//!
//! error <  0.01       -> NoCorrection
//! error >  threshold  -> Snap: P = S
//! otherwise           -> SmallCorrection: each tick move `blend` of the
//!                        remaining offset, so input keeps working while
//!                        the error drains away
//! ```
//!
//! Only position is corrected here. Rotation, speeds and jump state are the
//! client's own scratch state and are never touched.

use cairn_core::{NetworkConfig, Player};
use cairn_shared::Vec3;

/// Errors smaller than this are treated as agreement.
const AGREEMENT_EPSILON: f32 = 0.01;

/// Result of applying one server correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReconciliationResult {
    /// No correction needed - prediction was accurate.
    NoCorrection,
    /// Small correction, blended in over the next ticks.
    SmallCorrection {
        /// Error magnitude.
        error: f32,
    },
    /// Large correction - snapped to server position.
    Snap {
        /// Error magnitude.
        error: f32,
    },
}

/// Applies server position corrections to the predicted local player.
#[derive(Clone, Debug)]
pub struct Reconciler {
    /// Offset still to be applied.
    pending: Option<Vec3>,
    /// Fraction of the remaining offset applied per tick (0-1).
    blend: f32,
    /// Error above which the position snaps.
    snap_threshold: f32,
}

impl Reconciler {
    /// Creates a reconciler.
    #[must_use]
    pub fn new(snap_threshold: f32, blend: f32) -> Self {
        Self {
            pending: None,
            blend: blend.clamp(0.0, 1.0),
            snap_threshold: snap_threshold.max(0.0),
        }
    }

    /// Creates a reconciler from the network section of the config.
    #[must_use]
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(config.correction_snap_threshold, config.correction_blend)
    }

    /// Applies an authoritative position.
    ///
    /// A new correction replaces whatever was still pending.
    pub fn correct(&mut self, player: &mut Player, server_position: Vec3) -> ReconciliationResult {
        let offset = server_position - player.position;
        let error = offset.length();

        if error < AGREEMENT_EPSILON {
            self.pending = None;
            return ReconciliationResult::NoCorrection;
        }

        if error > self.snap_threshold {
            player.position = server_position;
            self.pending = None;
            tracing::debug!(player = %player.id, error, "Position snapped to server");
            return ReconciliationResult::Snap { error };
        }

        self.pending = Some(offset);
        ReconciliationResult::SmallCorrection { error }
    }

    /// Applies one tick's share of the pending offset.
    ///
    /// Returns `true` while a correction was in progress.
    pub fn step(&mut self, player: &mut Player) -> bool {
        let Some(remaining) = self.pending else {
            return false;
        };
        let share = remaining * self.blend;
        let rest = remaining - share;
        if rest.length() < AGREEMENT_EPSILON {
            player.position += remaining;
            self.pending = None;
        } else {
            player.position += share;
            self.pending = Some(rest);
        }
        true
    }

    /// True while a blended correction is still being applied.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Offset not yet applied.
    #[must_use]
    pub const fn pending(&self) -> Option<Vec3> {
        self.pending
    }

    /// Drops any pending correction.
    pub fn reset(&mut self) {
        self.pending = None;
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default())
    }
}
