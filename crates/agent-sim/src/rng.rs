//! Seeded randomness shared by every stochastic decision point.

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Seeded random number generator.
pub struct SimRng(pub SmallRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(SmallRng::from_entropy())
    }

    /// Weighted coin flip; `p` is clamped to [0, 1].
    pub fn gen_bool(&mut self, p: f32) -> bool {
        let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
        self.0.gen_bool(p as f64)
    }

    pub fn gen_range(&mut self, low: f32, high: f32) -> f32 {
        if high <= low {
            return low;
        }
        self.0.gen_range(low..high)
    }

    /// Standard normal sample via Box-Muller.
    pub fn standard_normal(&mut self) -> f32 {
        let u1: f64 = self.0.gen_range(f64::MIN_POSITIVE..1.0);
        let u2: f64 = self.0.gen();
        ((-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()) as f32
    }

    /// Normal sample with the given standard deviation, bounded to ±3σ.
    pub fn gaussian(&mut self, std_dev: f32) -> f32 {
        if std_dev <= 0.0 {
            return 0.0;
        }
        (self.standard_normal() * std_dev).clamp(-3.0 * std_dev, 3.0 * std_dev)
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.0)
    }

    /// Pick `n` distinct items.
    pub fn sample<'a, T>(&mut self, items: &'a [T], n: usize) -> Vec<&'a T> {
        items.choose_multiple(&mut self.0, n).collect()
    }
}

/// Random source shared across concurrent agent tasks.
pub struct SharedRng(Mutex<SimRng>);

impl SharedRng {
    pub fn new(rng: SimRng) -> Self {
        Self(Mutex::new(rng))
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(SimRng::seeded(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(SimRng::from_entropy())
    }

    /// Run `f` with exclusive access to the generator.
    pub fn with<R>(&self, f: impl FnOnce(&mut SimRng) -> R) -> R {
        f(&mut self.0.lock())
    }

    pub fn gen_bool(&self, p: f32) -> bool {
        self.with(|rng| rng.gen_bool(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_is_bounded() {
        let mut rng = SimRng::seeded(7);
        for _ in 0..10_000 {
            let x = rng.gaussian(0.01);
            assert!(x.abs() <= 0.03 + f32::EPSILON);
        }
        assert_eq!(rng.gaussian(0.0), 0.0);
    }

    #[test]
    fn test_gen_bool_extremes() {
        let mut rng = SimRng::seeded(1);
        assert!((0..100).all(|_| rng.gen_bool(1.0)));
        assert!((0..100).all(|_| !rng.gen_bool(0.0)));
        assert!((0..100).all(|_| !rng.gen_bool(f32::NAN)));
    }

    #[test]
    fn test_sample_is_distinct() {
        let mut rng = SimRng::seeded(3);
        let items = ["a", "b", "c", "d"];
        let picked = rng.sample(&items, 3);
        assert_eq!(picked.len(), 3);
        let mut sorted: Vec<_> = picked.into_iter().collect();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 3);
    }
}
