//! Seeded randomness.
//!
//! The simulation needs random numbers in two places: initial placement for force-directed
//! layouts, and the small nudge applied to coincident particles. Both are driven by an explicit
//! seed so that a layout can be reproduced exactly.

use crate::geometry::Vec3;

/// Lower/upper bound of each nudge component.
pub const NUDGE_MIN: f64 = 0.1;
pub const NUDGE_MAX: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// A generator whose stream depends on `seed` and every key in `keys`.
    pub fn keyed(seed: u64, keys: &[u64]) -> Self {
        let mut rng = Self::new(seed);
        for &k in keys {
            rng.mix_u64(k);
        }
        rng
    }

    fn mix_u64(&mut self, v: u64) {
        // One-way mix to decorrelate keys.
        self.state ^= v.wrapping_add(1).wrapping_mul(0x9E3779B97F4A7C15_u64);
        if self.state == 0 {
            self.state = 1;
        }
        let _ = self.next_u64();
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }

    /// Uniform in `[0, 1)` with 53 bits of precision.
    pub fn next_f64_unit(&mut self) -> f64 {
        let u = self.next_u64() >> 11;
        (u as f64) / ((1u64 << 53) as f64)
    }

    /// Uniform in `[lo, hi)`.
    pub fn next_f64_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64_unit()
    }
}

/// Source of the displacement used when two particles (nearly) coincide.
///
/// Implementations must be pure functions of their arguments: the repulsion pass may evaluate
/// pairs on several threads and in any order.
pub trait Jitter: Sync {
    /// Displacement for the pair `(a, b)` (particle indices, `a < b` for repulsion, edge order
    /// for springs) at simulation step `step`. Each component should lie in
    /// `[NUDGE_MIN, NUDGE_MAX)`.
    fn nudge(&self, step: usize, a: usize, b: usize) -> Vec3;
}

/// Default [`Jitter`]: a fresh xorshift64* stream keyed by `(seed, step, a, b)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededJitter {
    seed: u64,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Independent jitter stream, e.g. one per spaced layer.
    pub fn stream(&self, key: u64) -> Self {
        Self {
            seed: XorShift64Star::keyed(self.seed, &[key]).next_u64(),
        }
    }
}

impl Jitter for SeededJitter {
    fn nudge(&self, step: usize, a: usize, b: usize) -> Vec3 {
        let mut rng = XorShift64Star::keyed(self.seed, &[step as u64, a as u64, b as u64]);
        [
            rng.next_f64_range(NUDGE_MIN, NUDGE_MAX),
            rng.next_f64_range(NUDGE_MIN, NUDGE_MAX),
            rng.next_f64_range(NUDGE_MIN, NUDGE_MAX),
        ]
    }
}

/// Constant nudge for tests that need to know the exact displacement.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub Vec3);

#[cfg(test)]
impl Jitter for FixedJitter {
    fn nudge(&self, _step: usize, _a: usize, _b: usize) -> Vec3 {
        self.0
    }
}
