//! Random source abstraction
//!
//! Every roll in the simulation (level layout, enemy picks, spread, crits,
//! loot) goes through [`RandomSource`], so a run is fully reproducible from
//! its seed.

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg32;

/// Generator used for runs
pub type SimRng = Pcg32;

/// Create a run generator from a seed
pub fn seeded(seed: u64) -> SimRng {
    Pcg32::seed_from_u64(seed)
}

/// Uniform random numbers consumed by the simulation
pub trait RandomSource {
    /// Uniform float in [0, 1)
    fn next_f32(&mut self) -> f32;

    /// Uniform raw 32-bit value
    fn next_u32(&mut self) -> u32;

    /// Uniform float in [min, max)
    fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }

    /// Uniform integer in [0, n). Returns 0 when `n == 0`.
    fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        ((self.next_u32() as u64 * n as u64) >> 32) as u32
    }

    /// Uniform integer in [min, max] (inclusive)
    fn int_between(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        min + self.below((max - min + 1) as u32) as i32
    }

    /// True with probability `p`
    fn chance(&mut self, p: f32) -> bool {
        self.next_f32() < p
    }

    /// Uniform angle in [0, TAU)
    fn angle(&mut self) -> f32 {
        self.next_f32() * std::f32::consts::TAU
    }
}

impl<R: RngCore> RandomSource for R {
    fn next_f32(&mut self) -> f32 {
        self.random::<f32>()
    }

    fn next_u32(&mut self) -> u32 {
        RngCore::next_u32(self)
    }
}
