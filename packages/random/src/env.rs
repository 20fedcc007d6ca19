//! Seed configuration read from the process environment.
//!
//! `BRAID_SEED` pins the seed for every scheduler built without an explicit
//! one, so a failing interleaving found by a seed sweep can be replayed by
//! exporting the reported seed. `BRAID_SEED=random` draws a fresh seed from
//! the operating system instead, logged at `info`.

use std::sync::LazyLock;

use thiserror::Error;

use crate::{DEFAULT_SEED, entropy_seed};

/// Environment variable consulted by [`initial_seed`].
pub const SEED_ENV_VAR: &str = "BRAID_SEED";

/// `BRAID_SEED` value that requests a seed drawn from entropy.
pub const RANDOM_SEED_VALUE: &str = "random";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Invalid {SEED_ENV_VAR} value '{value}': {source}")]
    Parse {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Reads `BRAID_SEED`.
///
/// Returns `Ok(None)` when the variable is unset, and a fresh
/// [`entropy_seed`] when it is `random`.
///
/// # Errors
///
/// * If the variable is set but is neither `random` nor a valid `u64`
pub fn seed_from_env() -> Result<Option<u64>, SeedError> {
    let Ok(value) = std::env::var(SEED_ENV_VAR) else {
        return Ok(None);
    };

    if value.trim().eq_ignore_ascii_case(RANDOM_SEED_VALUE) {
        let seed = entropy_seed();
        log::info!("{SEED_ENV_VAR}={value}: replay with {SEED_ENV_VAR}={seed}");
        return Ok(Some(seed));
    }

    value
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|source| SeedError::Parse { value, source })
}

static INITIAL_SEED: LazyLock<u64> = LazyLock::new(|| match seed_from_env() {
    Ok(Some(seed)) => {
        log::debug!("using {SEED_ENV_VAR}={seed}");
        seed
    }
    Ok(None) => DEFAULT_SEED,
    Err(e) => {
        log::warn!("{e}, falling back to seed={DEFAULT_SEED}");
        DEFAULT_SEED
    }
});

/// The process-wide default seed.
///
/// Resolved once from `BRAID_SEED`, falling back to [`DEFAULT_SEED`]. With
/// `BRAID_SEED=random` every scheduler in the process shares the one drawn
/// seed.
#[must_use]
pub fn initial_seed() -> u64 {
    *INITIAL_SEED
}
