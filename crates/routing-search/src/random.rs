//! Seeded RNG used throughout search for reproducible runs.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::{rngs::StdRng, Rng, SeedableRng};

pub struct Random {
    rng: StdRng,
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}

impl Random {
    pub fn new() -> Self {
        Self::seed(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        )
    }

    pub fn seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn u32(&mut self) -> u32 {
        self.rng.gen()
    }

    pub fn f64(&mut self) -> f64 {
        self.rng.gen()
    }

    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.rng.gen_range(low..high)
    }

    pub fn chance(&mut self, (numerator, denominator): (f64, f64)) -> bool {
        if numerator == denominator {
            return true;
        }
        self.f64() < (numerator / denominator)
    }

    /// Fisher-Yates shuffle, used by the Savings builders' neighbor
    /// tie-breaking and by LNS destroy operators.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range_usize(0, i + 1);
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_random_is_deterministic() {
        let mut a = Random::seed(42);
        let mut b = Random::seed(42);
        for _ in 0..100 {
            assert_eq!(a.u32(), b.u32());
            assert_eq!(a.range_usize(0, 100), b.range_usize(0, 100));
        }
    }
}
