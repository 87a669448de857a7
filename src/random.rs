//! Randomness source for anchor selection

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Produces uniform random permutations.
pub trait RandomSource: Send {
    /// A uniformly random permutation of `0..n`.
    fn shuffle_permutation(&mut self, n: usize) -> Vec<usize>;
}

/// [`RandomSource`] backed by [`StdRng`].
#[derive(Debug, Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    /// Seed from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source for reproducible anchor selection.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for StdRandom {
    fn shuffle_permutation(&mut self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut self.rng);
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permutation_contains_every_index() {
        let mut rng = StdRandom::seeded(7);
        let mut perm = rng.shuffle_permutation(50);
        perm.sort_unstable();
        assert_eq!(perm, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = StdRandom::seeded(42).shuffle_permutation(20);
        let b = StdRandom::seeded(42).shuffle_permutation(20);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_permutation() {
        assert!(StdRandom::seeded(1).shuffle_permutation(0).is_empty());
    }
}
