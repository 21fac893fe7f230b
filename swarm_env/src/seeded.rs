//! ChaCha8-backed implementation of [`SimRng`].

use crate::SimRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Normal};

/// Deterministic RNG for one simulation run.
///
/// Two instances built from the same seed yield identical streams on every
/// platform, which is what makes a `RunResult` reproducible from its seed.
#[derive(Debug, Clone)]
pub struct SeededRng {
    /// Seed this stream was created from
    seed: u64,

    /// Underlying stream
    rng: ChaCha8Rng,
}

impl SeededRng {
    /// Creates a new stream from the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a stream seeded from OS entropy (for unseeded configurations).
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// Returns the seed (for logging/debugging).
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl SimRng for SeededRng {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn next_int(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..hi)
    }

    fn next_gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => mean,
        }
    }

    fn next_exponential(&mut self, rate: f64) -> f64 {
        if !(rate > 0.0) {
            return f64::INFINITY;
        }
        match Exp::new(rate) {
            Ok(exp) => exp.sample(&mut self.rng),
            Err(_) => f64::INFINITY,
        }
    }
}
