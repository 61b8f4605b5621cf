//! A simple pseudorandom number generator.
//!
//! A translation of the *really* minimal C PCG32 implementation from <https://www.pcg-random.org/>, satisfying the [RngCore](rand_core::RngCore) trait.
//!
//! The engine draws on this for randomised decisions when a seed is supplied; with the zero seed the engine never consults it, keeping default solves deterministic.

use rand::SeedableRng;
use rand_core::{impls, RngCore};

/// State and increment
#[derive(Default)]
pub struct MinimalPCG32 {
    state: u64,
    inc: u64,
}

impl RngCore for MinimalPCG32 {
    fn next_u32(&mut self) -> u32 {
        let old_state = self.state;

        self.state = old_state
            .wrapping_mul(6364136223846793005_u64)
            .wrapping_add(self.inc);

        let xorshifted = ((old_state >> 18) ^ old_state) >> 27;
        let rot = (old_state >> 59) as u32;
        (xorshifted as u32).rotate_right(rot)
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }
}

impl SeedableRng for MinimalPCG32 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        /// Entirely unmotivated.
        const INCREMENT: u64 = 3215534235932367344;
        Self {
            state: (u64::from_le_bytes(seed)).wrapping_add(INCREMENT),
            inc: INCREMENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_diverge() {
        let mut a = MinimalPCG32::from_seed(2u64.to_le_bytes());
        let mut b = MinimalPCG32::from_seed(73u64.to_le_bytes());

        let draws_a: Vec<u32> = (0..5).map(|_| a.next_u32()).collect();
        let draws_b: Vec<u32> = (0..5).map(|_| b.next_u32()).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn deterministic_for_a_seed() {
        let mut a = MinimalPCG32::from_seed(7u64.to_le_bytes());
        let mut b = MinimalPCG32::from_seed(7u64.to_le_bytes());
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }
}
