//! # Remote Player Interpolation
//!
//! Remote players run no physics. Each received pose becomes a target and
//! the visible position glides toward it by a fixed fraction per tick.

use std::collections::BTreeMap;

use cairn_core::{Collection, Player};
use cairn_shared::Vec3;

/// Per-player interpolation targets.
#[derive(Clone, Debug, Default)]
pub struct RemoteInterpolator {
    targets: BTreeMap<String, Vec3>,
    blend: f32,
    snap_epsilon: f32,
}

impl RemoteInterpolator {
    /// Creates an interpolator.
    #[must_use]
    pub fn new(blend: f32, snap_epsilon: f32) -> Self {
        Self {
            targets: BTreeMap::new(),
            blend: blend.clamp(0.0, 1.0),
            snap_epsilon,
        }
    }

    /// Records the latest authoritative position for `id`.
    pub fn set_target(&mut self, id: &str, position: Vec3) {
        self.targets.insert(id.to_owned(), position);
    }

    /// Current target, if any.
    #[must_use]
    pub fn target(&self, id: &str) -> Option<Vec3> {
        self.targets.get(id).copied()
    }

    /// Drops the target for a departed player.
    pub fn forget(&mut self, id: &str) {
        self.targets.remove(id);
    }

    /// Drops every target.
    pub fn clear(&mut self) {
        self.targets.clear();
    }

    /// Moves every remote player toward its target. Returns how many moved.
    pub fn step(&mut self, players: &mut Collection<Player>) -> usize {
        self.targets.retain(|id, _| players.contains(id));

        let mut moved = 0;
        for (id, target) in &self.targets {
            let Some(player) = players.get(id) else {
                continue;
            };
            if player.position == *target {
                continue;
            }
            let next = if player.position.distance(*target) <= self.snap_epsilon {
                *target
            } else {
                player.position.lerp(*target, self.blend)
            };
            players.update(id, |p| p.position = next);
            moved += 1;
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glides_then_snaps() {
        let mut players = Collection::new();
        players.insert(Player::new("p2", "bo", Vec3::ZERO));
        let mut interp = RemoteInterpolator::new(0.15, 0.01);
        interp.set_target("p2", Vec3::new(10.0, 0.0, 0.0));

        interp.step(&mut players);
        let x = players.get("p2").unwrap().position.x;
        assert!((x - 1.5).abs() < 1e-5);

        for _ in 0..200 {
            interp.step(&mut players);
        }
        assert_eq!(players.get("p2").unwrap().position, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(interp.step(&mut players), 0);
    }

    #[test]
    fn test_targets_for_missing_players_are_dropped() {
        let mut players: Collection<Player> = Collection::new();
        let mut interp = RemoteInterpolator::new(0.15, 0.01);
        interp.set_target("gone", Vec3::ZERO);
        interp.step(&mut players);
        assert!(interp.target("gone").is_none());
    }
}
