use std::rc::Rc;

use crate::{Error, Scheduler};

/// Shared handle to a scheduled or schedulable step.
pub type ContinuationRef = Rc<dyn Continuation>;

/// One resumable step of a cooperative program.
///
/// The scheduler only calls [`Continuation::compute`] on a continuation
/// whose ready time has passed and whose [`Continuation::is_ready`] held
/// immediately before. A continuation suspends by returning from `compute`
/// after scheduling whatever should run next, possibly itself.
pub trait Continuation {
    /// Must be free of side effects; the scheduler may ask repeatedly.
    fn is_ready(&self) -> bool;

    /// Performs one step.
    ///
    /// # Errors
    ///
    /// * If the step fails; the error aborts the scheduler's current run
    fn compute(self: Rc<Self>, scheduler: &Scheduler) -> Result<(), Error>;

    /// The remaining steps, if this continuation is a sequence.
    ///
    /// [`sequence`](crate::sequence) splices these in place of the
    /// continuation itself.
    fn as_steps(&self) -> Option<&[ContinuationRef]> {
        None
    }
}

struct NoOp;

impl Continuation for NoOp {
    fn is_ready(&self) -> bool {
        true
    }

    fn compute(self: Rc<Self>, _scheduler: &Scheduler) -> Result<(), Error> {
        Ok(())
    }

    fn as_steps(&self) -> Option<&[ContinuationRef]> {
        Some(&[])
    }
}

/// A continuation that does nothing.
///
/// Scheduling it is ignored and sequences drop it.
#[must_use]
pub fn no_op() -> ContinuationRef {
    Rc::new(NoOp)
}

pub(crate) fn is_no_op(continuation: &dyn Continuation) -> bool {
    continuation.as_steps().is_some_and(<[_]>::is_empty)
}
