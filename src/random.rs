//! Injectable randomness
//!
//! Backoff jitter and inter-page delays draw from a [`RandomSource`] so tests
//! can pin timing down. Production code uses [`ThreadRandom`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Source of uniform samples
pub trait RandomSource: Send + Sync {
    /// Sample uniformly from `[low, high]`. Returns `low` when the range is empty.
    fn uniform(&self, low: f64, high: f64) -> f64;
}

/// Thread-local OS-seeded generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if !(high > low) {
            return low;
        }
        rand::rng().random_range(low..=high)
    }
}

/// Reproducible generator seeded from a fixed value
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if !(high > low) {
            return low;
        }
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        rng.random_range(low..=high)
    }
}

/// Always returns the same position within the range.
///
/// `fraction` 0.0 yields `low`, 1.0 yields `high`.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    fraction: f64,
}

impl FixedRandom {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Always the low end: no jitter, minimum delay
    pub fn lowest() -> Self {
        Self::new(0.0)
    }

    /// Always the high end: full jitter, maximum delay
    pub fn highest() -> Self {
        Self::new(1.0)
    }
}

impl RandomSource for FixedRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if !(high > low) {
            return low;
        }
        low + (high - low) * self.fraction
    }
}
