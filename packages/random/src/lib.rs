#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Seeded random source used to arbitrate between simultaneously ready work.
//!
//! The scheduler only ever asks for "an integer below `bound`", so the
//! capability exposed here is narrow: [`RandomSource::next_int`].
//! Two sources built from the same seed produce identical sequences.
//!
//! # Examples
//!
//! ```rust
//! use braid_random::{RandomSource, SeededRandom};
//!
//! let a = SeededRandom::new(7);
//! let b = SeededRandom::new(7);
//!
//! assert_eq!(a.next_int(10), b.next_int(10));
//! ```

#[cfg(feature = "env")]
pub mod env;

use std::sync::{Arc, Mutex, PoisonError};

use rand::{Rng as _, SeedableRng, rngs::SmallRng};

#[cfg(feature = "env")]
pub use env::{SeedError, initial_seed, seed_from_env};

/// Seed used when neither the caller nor the environment supplies one.
pub const DEFAULT_SEED: u64 = 0;

/// Draws a fresh seed from the operating system.
///
/// The seed is logged at `info` so the run can be replayed.
#[must_use]
pub fn entropy_seed() -> u64 {
    let seed = SmallRng::from_os_rng().random::<u64>();
    log::info!("entropy_seed: seed={seed}");
    seed
}

/// A source of uniformly distributed integers.
pub trait RandomSource {
    /// Returns an integer in `[0, bound)`.
    ///
    /// # Panics
    ///
    /// * If `bound` is `0`
    fn next_int(&self, bound: usize) -> usize;
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    #[inline]
    fn next_int(&self, bound: usize) -> usize {
        (**self).next_int(bound)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Arc<R> {
    #[inline]
    fn next_int(&self, bound: usize) -> usize {
        (**self).next_int(bound)
    }
}

/// [`RandomSource`] backed by `rand`'s `SmallRng`.
///
/// Clones share the same generator state.
#[derive(Clone)]
pub struct SeededRandom {
    seed: u64,
    rng: Arc<Mutex<SmallRng>>,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        log::debug!("SeededRandom::new seed={seed}");
        Self {
            seed,
            rng: Arc::new(Mutex::new(SmallRng::seed_from_u64(seed))),
        }
    }

    /// The seed this generator was created from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Rewinds the generator to the start of its seeded sequence.
    pub fn reset(&self) {
        log::debug!("reset to seed={}", self.seed);
        *self.rng.lock().unwrap_or_else(PoisonError::into_inner) =
            SmallRng::seed_from_u64(self.seed);
    }
}

impl std::fmt::Debug for SeededRandom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededRandom")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl RandomSource for SeededRandom {
    fn next_int(&self, bound: usize) -> usize {
        assert!(bound > 0, "next_int bound must be greater than zero");
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..bound)
    }
}
