//! Shared helpers for the workspace's tests: randomized value generation and
//! builders for the transactions the database consumes.

use arbitrary::{Arbitrary, Unstructured};
use rand::{thread_rng, RngCore};

pub mod bitcoin;

const ARB_GEN_LEN: usize = 128;

pub struct ArbitraryGenerator {
    rng: rand::rngs::ThreadRng,
    buf: Vec<u8>,
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitraryGenerator {
    pub fn new() -> Self {
        ArbitraryGenerator {
            rng: thread_rng(),
            buf: vec![0u8; ARB_GEN_LEN],
        }
    }

    pub fn new_with_size(s: usize) -> Self {
        ArbitraryGenerator {
            rng: thread_rng(),
            buf: vec![0u8; s],
        }
    }

    pub fn generate<'a, T: Arbitrary<'a> + Clone>(&'a mut self) -> T {
        self.rng.fill_bytes(&mut self.buf);
        let mut u = Unstructured::new(&self.buf);
        T::arbitrary(&mut u).expect("Failed to generate arbitrary instance")
    }
}
