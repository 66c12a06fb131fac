//! Deterministic random number generation for demo seeding.
//!
//! RULE: nothing in the core calls a platform RNG. The allocation engines
//! are fully deterministic and take no randomness at all; only the demo
//! seeder draws numbers, and it draws them from a RosterRng seeded by the
//! caller, so the same seed always yields the same roster.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct RosterRng {
    inner: Pcg64Mcg,
}

impl RosterRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an integer in [lo, hi].
    pub fn range_inclusive(&mut self, lo: u64, hi: u64) -> u64 {
        lo + self.next_u64_below(hi - lo + 1)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element. Panics on an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RosterRng::new(42);
        let mut b = RosterRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64_below(1_000), b.next_u64_below(1_000));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = RosterRng::new(1);
        let mut b = RosterRng::new(2);
        let xs: Vec<u64> = (0..20).map(|_| a.next_u64_below(1_000_000)).collect();
        let ys: Vec<u64> = (0..20).map(|_| b.next_u64_below(1_000_000)).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn draws_stay_in_range() {
        let mut rng = RosterRng::new(7);
        for _ in 0..1_000 {
            let f = rng.next_f64();
            assert!((0.0..1.0).contains(&f));
            let r = rng.range_inclusive(2019, 2024);
            assert!((2019..=2024).contains(&r));
        }
    }
}
