//! Injectable randomness
//!
//! Every random decision in the simulation goes through `RandomSource`, so a
//! match replays exactly from its seed and tests can script outcomes.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Source of random numbers for simulation decisions
pub trait RandomSource {
    /// Uniform in [0, 1)
    fn next_f32(&mut self) -> f32;

    /// Uniform index in [0, len); `len` must be non-zero
    fn next_index(&mut self, len: usize) -> usize {
        ((self.next_f32() * len as f32) as usize).min(len.saturating_sub(1))
    }

    /// Uniform in [-1, 1)
    fn next_signed(&mut self) -> f32 {
        self.next_f32() * 2.0 - 1.0
    }
}

/// Seeded PCG generator used by live simulations
#[derive(Debug, Clone)]
pub struct SimRng {
    seed: u64,
    rng: Pcg32,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Pick a fresh seed for a live match; record `seed()` to replay it
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SimRng {
    fn next_f32(&mut self) -> f32 {
        self.rng.random()
    }

    fn next_index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

/// Replays a fixed list of values, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: Vec<f32>,
    cursor: usize,
}

impl ScriptedRng {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, cursor: 0 }
    }
}

impl RandomSource for ScriptedRng {
    fn next_f32(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}
