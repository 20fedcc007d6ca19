#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Monotonic clocks measured in integer nanoseconds.
//!
//! The scheduler reads time through the [`Clock`] capability only. Tests and
//! simulations drive a [`VirtualClock`] explicitly; [`SystemClock`] is
//! available for running the same programs against the host's monotonic
//! clock.

#[cfg(feature = "std")]
pub mod standard;

#[cfg(feature = "virtual")]
pub mod simulator;

use std::{rc::Rc, sync::Arc};

#[cfg(feature = "std")]
pub use standard::SystemClock;

#[cfg(feature = "virtual")]
pub use simulator::VirtualClock;

/// A source of monotonic, non-decreasing time.
pub trait Clock {
    /// Nanoseconds since the clock's origin.
    fn now(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    #[inline]
    fn now(&self) -> u64 {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    #[inline]
    fn now(&self) -> u64 {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Converts a [`std::time::Duration`] to whole nanoseconds, saturating at
/// `u64::MAX`.
#[must_use]
pub fn duration_nanos(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
