//! Randomness source for token generation.

use rand::rngs::OsRng;
use rand::RngCore;

/// Fills buffers with unpredictable bytes.
pub trait RandomSource: Send + Sync {
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error>;
}

/// Operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(buf)
    }
}
