//! Virtual time that only moves when the driver says so.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::{Clock, duration_nanos};

/// A manually advanced clock.
///
/// Clones share the same instant, so a driver can keep one handle while the
/// scheduler reads through another.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    nanos: Arc<AtomicU64>,
}

impl VirtualClock {
    /// Creates a clock starting at `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock starting at `nanos`.
    #[must_use]
    pub fn starting_at(nanos: u64) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(nanos)),
        }
    }

    /// Moves time forward by `duration` and returns the new now.
    pub fn advance(&self, duration: Duration) -> u64 {
        let delta = duration_nanos(duration);
        let previous = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(delta))
            })
            .unwrap_or_else(|now| now);
        let now = previous.saturating_add(delta);
        log::trace!("advance: delta={delta} now={now}");
        now
    }

    /// Moves time forward to `nanos`.
    ///
    /// Targets in the past are ignored; the clock never runs backwards.
    pub fn advance_to(&self, nanos: u64) -> u64 {
        let now = self.nanos.fetch_max(nanos, Ordering::SeqCst).max(nanos);
        log::trace!("advance_to: target={nanos} now={now}");
        now
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst)
    }
}
