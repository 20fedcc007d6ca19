#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Deterministic cooperative concurrency: bounded channels, select, and
//! suspendable programs built from combinators.
//!
//! Programs are trees of [`Continuation`]s. Each one answers "can you run
//! now?" through [`Continuation::is_ready`] and performs exactly one step in
//! [`Continuation::compute`], scheduling whatever should run next. The
//! [`Scheduler`] picks among due and ready continuations with a seeded random
//! source, so a seed reproduces an interleaving and a sweep of seeds explores
//! many of them.
//!
//! # Example
//!
//! ```rust
//! use std::{cell::Cell, rc::Rc};
//!
//! use braid::{Builder, select, sequence, statement};
//!
//! let scheduler = Builder::new().seed(7).build();
//! let channel = scheduler.create_bounded_channel::<u32>(1)?;
//! let received = Rc::new(Cell::new(0));
//!
//! let writing = channel.writing();
//! scheduler.schedule(select([writing.on_send(|w| w.put(42))]));
//!
//! let sink = received.clone();
//! scheduler.schedule(sequence([
//!     select([channel.reading().on_receive(move |value| sink.set(value))]),
//!     statement(move || writing.close()),
//! ]));
//!
//! scheduler.trigger_actions()?;
//!
//! assert_eq!(received.get(), 42);
//! # Ok::<(), braid::Error>(())
//! ```

pub mod channel;
pub mod continuation;
pub mod control;
pub mod scheduler;
pub mod select;

use std::rc::Rc;

use braid_time::{Clock, VirtualClock};

pub use braid_random as random;
pub use braid_time as time;

pub use channel::{Channel, ChannelError, ClosingState, Reading, Writing};
pub use continuation::{Continuation, ContinuationRef, no_op};
pub use control::{select, sequence, statement, while_loop, while_select};
pub use scheduler::Scheduler;
pub use select::{ClauseKind, Readiness, SelectClause};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("{0} is not reentrant")]
    Reentrant(&'static str),
    #[error("Select can't run with no ready send/receive clauses")]
    NoReadyClauses,
    #[error("Activated {0} clause when channel wasn't ready")]
    ClauseNotReady(ClauseKind),
    #[error("Invoked receiver for a closed channel")]
    ReceiveAfterClose,
}

/// The result of a receiver, statement, or clause action.
///
/// Normalises what user code returns into the continue-signal consumed by
/// [`while_select`]: `()` continues, a `bool` is the signal itself, and a
/// `Result` propagates its error.
pub trait Outcome {
    /// # Errors
    ///
    /// * If the value carries an error
    fn into_outcome(self) -> Result<bool, Error>;
}

impl Outcome for () {
    #[inline]
    fn into_outcome(self) -> Result<bool, Error> {
        Ok(true)
    }
}

impl Outcome for bool {
    #[inline]
    fn into_outcome(self) -> Result<bool, Error> {
        Ok(self)
    }
}

impl<T: Outcome, E: Into<Error>> Outcome for Result<T, E> {
    #[inline]
    fn into_outcome(self) -> Result<bool, Error> {
        self.map_err(Into::into)?.into_outcome()
    }
}

/// Configures a [`Scheduler`].
///
/// Without an explicit seed the scheduler uses `BRAID_SEED` from the
/// environment, or `0`. Without a clock it drives its own [`VirtualClock`].
/// The seed in use is reported by [`Scheduler::seed`].
pub struct Builder {
    seed: Option<u64>,
    clock: Option<Rc<dyn Clock>>,
    driver: Option<VirtualClock>,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("seed", &self.seed)
            .field("clock", &self.clock.as_ref().map(|x| x.now()))
            .field("driver", &self.driver)
            .finish()
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            seed: None,
            clock: None,
            driver: None,
        }
    }

    pub fn seed<T: Into<Option<u64>>>(&mut self, seed: T) -> &mut Self {
        self.seed = seed.into();
        self
    }

    /// Uses a fresh seed drawn from the operating system, so repeated runs
    /// explore different interleavings. The seed is logged at `info`.
    pub fn random_seed(&mut self) -> &mut Self {
        self.seed(random::entropy_seed())
    }

    /// Reads time from `clock`. The scheduler can't advance it, so
    /// [`Scheduler::run`] stops at the first batch that isn't due yet.
    pub fn clock(&mut self, clock: impl Clock + 'static) -> &mut Self {
        self.clock = Some(Rc::new(clock));
        self.driver = None;
        self
    }

    /// Reads time from a shared [`VirtualClock`] that [`Scheduler::run`] may
    /// advance.
    pub fn virtual_clock(&mut self, clock: VirtualClock) -> &mut Self {
        self.clock = Some(Rc::new(clock.clone()));
        self.driver = Some(clock);
        self
    }

    #[must_use]
    pub fn build(&self) -> Scheduler {
        let seed = self.seed.unwrap_or_else(random::initial_seed);
        log::debug!("build: seed={seed}");

        let (clock, driver) = if let Some(clock) = &self.clock {
            (clock.clone(), self.driver.clone())
        } else {
            let driver = VirtualClock::new();
            let clock: Rc<dyn Clock> = Rc::new(driver.clone());
            (clock, Some(driver))
        };

        Scheduler::from_parts(clock, driver, random::SeededRandom::new(seed), Some(seed))
    }
}
