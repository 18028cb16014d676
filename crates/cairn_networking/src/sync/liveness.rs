//! Liveness tracking for remote players.
//!
//! Ages are advanced by tick `dt`, never read from the wall clock, so a
//! paused or slowed simulation does not prune everyone at once.

use std::collections::BTreeMap;

/// Seconds since each tracked player was last heard from.
#[derive(Clone, Debug)]
pub struct LivenessTracker {
    ages: BTreeMap<String, f32>,
    timeout: f32,
}

impl LivenessTracker {
    /// Creates a tracker that expires players after `timeout` seconds.
    #[must_use]
    pub fn new(timeout: f32) -> Self {
        Self {
            ages: BTreeMap::new(),
            timeout,
        }
    }

    /// Records a sign of life.
    pub fn touch(&mut self, id: &str) {
        self.ages.insert(id.to_owned(), 0.0);
    }

    /// Stops tracking `id`.
    pub fn forget(&mut self, id: &str) {
        self.ages.remove(id);
    }

    /// True if `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ages.contains_key(id)
    }

    /// Seconds since `id` was last touched.
    #[must_use]
    pub fn age(&self, id: &str) -> Option<f32> {
        self.ages.get(id).copied()
    }

    /// Number of tracked players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ages.len()
    }

    /// True if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    /// Ages every entry and removes those past the timeout.
    ///
    /// Returns the expired ids in id order.
    pub fn advance(&mut self, dt: f32) -> Vec<String> {
        let timeout = self.timeout;
        let mut expired = Vec::new();
        self.ages.retain(|id, age| {
            *age += dt;
            if *age >= timeout {
                expired.push(id.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.ages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_after_timeout() {
        let mut liveness = LivenessTracker::new(10.0);
        liveness.touch("p9");

        for _ in 0..99 {
            assert!(liveness.advance(0.1).is_empty());
        }
        assert_eq!(liveness.advance(0.2), vec!["p9".to_owned()]);
        assert!(!liveness.contains("p9"));
    }

    #[test]
    fn test_touch_resets_age() {
        let mut liveness = LivenessTracker::new(1.0);
        liveness.touch("a");
        liveness.touch("b");
        liveness.advance(0.8);
        liveness.touch("a");
        let expired = liveness.advance(0.3);
        assert_eq!(expired, vec!["b".to_owned()]);
        assert!(liveness.contains("a"));
        assert!((liveness.age("a").unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_forget() {
        let mut liveness = LivenessTracker::new(1.0);
        liveness.touch("a");
        liveness.forget("a");
        assert!(liveness.is_empty());
        assert!(liveness.advance(5.0).is_empty());
    }
}
