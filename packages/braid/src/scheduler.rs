//! The deterministic run loop.
//!
//! A [`Scheduler`] holds continuations ordered by the virtual time at which
//! they become due. Each step of [`Scheduler::trigger_actions`] gathers the
//! due ones, keeps those that report ready, and runs exactly one of them,
//! chosen with the scheduler's seeded [`RandomSource`]. Everything else goes
//! back in the queue untouched.

use std::{
    cell::{Cell, RefCell},
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    rc::Rc,
    time::Duration,
};

use braid_random::RandomSource;
use braid_time::{Clock, VirtualClock, duration_nanos};

use crate::{
    Channel, ChannelError, Error,
    continuation::{ContinuationRef, is_no_op},
    select::SelectClause,
};

struct Task {
    continuation: ContinuationRef,
    ready_at: u64,
    // Breaks ready-time ties so the batch order only depends on what was
    // scheduled, never on heap internals.
    order: u64,
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ready_at
            .cmp(&other.ready_at)
            .then(self.order.cmp(&other.order))
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("ready_at", &self.ready_at)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

struct Entered<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> Entered<'a> {
    fn enter(flag: &'a Cell<bool>, op: &'static str) -> Result<Self, Error> {
        if flag.replace(true) {
            return Err(Error::Reentrant(op));
        }
        Ok(Self { flag })
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

struct Inner {
    clock: Rc<dyn Clock>,
    driver: Option<VirtualClock>,
    random: Box<dyn RandomSource>,
    seed: Option<u64>,
    tasks: RefCell<BinaryHeap<Reverse<Task>>>,
    next_order: Cell<u64>,
    triggering: Cell<bool>,
    selecting: Cell<bool>,
}

/// Runs continuations one step at a time in a reproducible order.
///
/// Cloning is cheap and every clone drives the same queue, so continuations
/// can capture a clone to schedule follow-up work.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

impl Scheduler {
    /// A scheduler reading time from `clock` and breaking ties with `random`.
    ///
    /// [`Scheduler::run`] can't advance a clock it doesn't own, so prefer
    /// [`Builder`](crate::Builder) unless the clock is driven externally.
    pub fn new(clock: impl Clock + 'static, random: impl RandomSource + 'static) -> Self {
        Self::from_parts(Rc::new(clock), None, random, None)
    }

    pub(crate) fn from_parts(
        clock: Rc<dyn Clock>,
        driver: Option<VirtualClock>,
        random: impl RandomSource + 'static,
        seed: Option<u64>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                clock,
                driver,
                random: Box::new(random),
                seed,
                tasks: RefCell::new(BinaryHeap::new()),
                next_order: Cell::new(0),
                triggering: Cell::new(false),
                selecting: Cell::new(false),
            }),
        }
    }

    /// The seed the scheduler's random source was created with, if it was
    /// built from one.
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.inner.seed
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.inner.clock.now()
    }

    /// Queues `continuation` to be due now.
    pub fn schedule(&self, continuation: ContinuationRef) {
        self.schedule_after(continuation, Duration::ZERO);
    }

    /// Queues `continuation` to be due once `delay` has elapsed on the clock.
    ///
    /// A [`no_op`](crate::no_op) is dropped instead of queued.
    pub fn schedule_after(&self, continuation: ContinuationRef, delay: Duration) {
        if is_no_op(continuation.as_ref()) {
            log::trace!("schedule_after: skipping no_op");
            return;
        }

        let ready_at = self.now().saturating_add(duration_nanos(delay));
        let order = self.inner.next_order.get();
        self.inner.next_order.set(order + 1);

        log::trace!("schedule_after: ready_at={ready_at} order={order}");
        self.inner.tasks.borrow_mut().push(Reverse(Task {
            continuation,
            ready_at,
            order,
        }));
    }

    /// Runs due, ready continuations until none remain, and returns how many
    /// steps ran.
    ///
    /// The clock is read once on entry. Continuations that are due but not
    /// ready stay queued; only a change made outside this call (advancing the
    /// clock, another program writing a channel) can unblock them.
    ///
    /// # Errors
    ///
    /// * If called from inside a continuation this scheduler is running
    /// * If a continuation fails; the rest of its batch stays queued
    pub fn trigger_actions(&self) -> Result<usize, Error> {
        let _entered = Entered::enter(&self.inner.triggering, "trigger_actions")?;
        let now = self.now();
        let mut steps = 0;

        loop {
            let due = self.take_due(now);
            if due.is_empty() {
                break;
            }

            let (mut ready, waiting): (Vec<_>, Vec<_>) = due
                .into_iter()
                .partition(|task| task.continuation.is_ready());

            if ready.is_empty() {
                log::trace!("trigger_actions: {} due, none ready", waiting.len());
                self.requeue(waiting);
                break;
            }

            let index = self.inner.random.next_int(ready.len());
            let chosen = ready.remove(index);
            log::trace!(
                "trigger_actions: running {chosen:?} ({index} of {})",
                ready.len() + 1
            );

            self.requeue(ready);
            self.requeue(waiting);

            chosen.continuation.compute(self)?;
            steps += 1;
        }

        log::debug!("trigger_actions: now={now} steps={steps}");

        Ok(steps)
    }

    /// Triggers actions, advancing the owned [`VirtualClock`] to the next ready
    /// time whenever nothing else is due, until no further progress is
    /// possible. Returns the total number of steps.
    ///
    /// Without an owned clock this is a single [`Scheduler::trigger_actions`].
    ///
    /// # Errors
    ///
    /// * If [`Scheduler::trigger_actions`] fails
    pub fn run(&self) -> Result<usize, Error> {
        let mut steps = 0;

        loop {
            steps += self.trigger_actions()?;

            let Some(driver) = &self.inner.driver else {
                break;
            };
            // Due work that isn't ready may be waiting on something scheduled
            // later, so look past it.
            let Some(next) = self.next_ready_after(self.now()) else {
                break;
            };
            log::trace!("run: advancing clock to {next}");
            driver.advance_to(next);
        }

        log::debug!("run: steps={steps} pending={}", self.pending());

        Ok(steps)
    }

    /// Runs one ready clause chosen at random and returns its continue-signal.
    ///
    /// # Errors
    ///
    /// * If called from inside a clause this scheduler is running
    /// * If no clause is ready
    /// * If the chosen clause's action fails
    pub fn run_ready_clauses(&self, clauses: &mut [SelectClause]) -> Result<bool, Error> {
        let _entered = Entered::enter(&self.inner.selecting, "run_ready_clauses")?;

        let ready = clauses
            .iter()
            .enumerate()
            .filter(|(_, clause)| clause.is_ready())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        if ready.is_empty() {
            return Err(Error::NoReadyClauses);
        }

        let total = clauses.len();
        let pick = self.inner.random.next_int(ready.len());
        let clause = &mut clauses[ready[pick]];
        log::debug!(
            "run_ready_clauses: {} of {total} ready, chose {clause:?}",
            ready.len(),
        );

        clause.attempt()
    }

    /// # Errors
    ///
    /// * If `capacity` is `0`
    #[allow(clippy::unused_self)]
    pub fn create_bounded_channel<T>(&self, capacity: usize) -> Result<Channel<T>, ChannelError> {
        Channel::bounded(capacity)
    }

    /// Number of scheduled continuations that haven't run yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// The earliest ready time among pending continuations.
    #[must_use]
    pub fn next_ready_at(&self) -> Option<u64> {
        self.inner
            .tasks
            .borrow()
            .peek()
            .map(|Reverse(task)| task.ready_at)
    }

    fn next_ready_after(&self, now: u64) -> Option<u64> {
        self.inner
            .tasks
            .borrow()
            .iter()
            .map(|Reverse(task)| task.ready_at)
            .filter(|ready_at| *ready_at > now)
            .min()
    }

    fn take_due(&self, now: u64) -> Vec<Task> {
        let mut tasks = self.inner.tasks.borrow_mut();
        let mut due = vec![];

        while tasks.peek().is_some_and(|Reverse(task)| task.ready_at <= now) {
            if let Some(Reverse(task)) = tasks.pop() {
                due.push(task);
            }
        }

        due
    }

    fn requeue(&self, tasks: Vec<Task>) {
        self.inner
            .tasks
            .borrow_mut()
            .extend(tasks.into_iter().map(Reverse));
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("seed", &self.inner.seed)
            .field("now", &self.now())
            .field("pending", &self.pending())
            .field("next_ready_at", &self.next_ready_at())
            .finish_non_exhaustive()
    }
}
