//! ==============================================================================
//! noise.rs - random source abstraction for synthetic telemetry
//! ==============================================================================
//!
//! purpose:
//!     the generator needs uniform noise and a random pond pick. it asks a
//!     `NoiseSource` for both instead of touching a global rng, so tests can
//!     script the exact sequence they want.
//!
//! relationships:
//!     - used by: generator.rs, live.rs
//!     - uses: rand (RandomNoise, entropy seeded)
//!
//! ==============================================================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait NoiseSource: Send {
    /// uniform sample in [0, 1)
    fn unit(&mut self) -> f64;

    /// uniform index in 0..len. callers never pass zero
    fn pick(&mut self, len: usize) -> usize;
}

// ==============================================================================
// rand-backed implementation (production)
// ==============================================================================

pub struct RandomNoise<R> {
    rng: R,
}

impl RandomNoise<StdRng> {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }
}

impl<R: Rng + Send> RandomNoise<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> NoiseSource for RandomNoise<R> {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len.max(1))
    }
}

// ==============================================================================
// scripted implementation (tests, deterministic demos)
// ==============================================================================

/// replays a fixed list of unit samples in a loop
pub struct ScriptedNoise {
    samples: Vec<f64>,
    cursor: usize,
}

impl ScriptedNoise {
    pub fn new(samples: Vec<f64>) -> Self {
        let samples = if samples.is_empty() { vec![0.5] } else { samples };
        Self { samples, cursor: 0 }
    }

    /// every draw returns `value`, which makes noise terms vanish at 0.5
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl NoiseSource for ScriptedNoise {
    fn unit(&mut self) -> f64 {
        let v = self.samples[self.cursor % self.samples.len()];
        self.cursor += 1;
        v
    }

    fn pick(&mut self, len: usize) -> usize {
        let len = len.max(1);
        ((self.unit() * len as f64) as usize).min(len - 1)
    }
}
