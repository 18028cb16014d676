//! Seeded id generation for entities the authority creates.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Produces `prefix-counter-salt` ids, unique within one generator and
/// reproducible for a given seed.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    rng: ChaCha8Rng,
    counter: u64,
}

impl IdGenerator {
    /// Creates a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            counter: 0,
        }
    }

    /// Next id with the given prefix.
    pub fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        let salt: u16 = self.rng.gen();
        format!("{prefix}-{}-{salt:04x}", self.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_reproducible() {
        let mut a = IdGenerator::new(9);
        let mut b = IdGenerator::new(9);
        let first: Vec<String> = (0..50).map(|_| a.next_id("tower")).collect();
        let second: Vec<String> = (0..50).map(|_| b.next_id("tower")).collect();
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 50);
        assert!(first[0].starts_with("tower-1-"));
    }
}
