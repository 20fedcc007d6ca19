//! Combinators for writing suspendable programs.
//!
//! Each combinator returns a [`ContinuationRef`]; nesting them builds the
//! program. Nothing runs until the result is handed to
//! [`Scheduler::schedule`].
//!
//! ```rust
//! use std::{cell::Cell, rc::Rc};
//!
//! use braid::{Builder, sequence, statement, while_loop};
//!
//! let scheduler = Builder::new().build();
//! let count = Rc::new(Cell::new(0));
//!
//! let (test, body) = (count.clone(), count.clone());
//! scheduler.schedule(while_loop(
//!     move || test.get() < 3,
//!     sequence([statement(move || body.set(body.get() + 1))]),
//! ));
//!
//! scheduler.trigger_actions()?;
//! assert_eq!(count.get(), 3);
//! # Ok::<(), braid::Error>(())
//! ```

use std::{cell::RefCell, rc::Rc};

use crate::{
    Error, Outcome, Scheduler,
    continuation::{Continuation, ContinuationRef, no_op},
    select::SelectClause,
};

struct Statement<F> {
    action: RefCell<F>,
}

impl<F, R> Continuation for Statement<F>
where
    F: FnMut() -> R + 'static,
    R: Outcome,
{
    fn is_ready(&self) -> bool {
        true
    }

    fn compute(self: Rc<Self>, _scheduler: &Scheduler) -> Result<(), Error> {
        (self.action.borrow_mut())().into_outcome().map(|_| ())
    }
}

/// A terminal step that runs `action` once per scheduling.
pub fn statement<F, R>(action: F) -> ContinuationRef
where
    F: FnMut() -> R + 'static,
    R: Outcome + 'static,
{
    Rc::new(Statement {
        action: RefCell::new(action),
    })
}

struct Sequence {
    steps: Rc<[ContinuationRef]>,
    position: usize,
}

impl Continuation for Sequence {
    fn is_ready(&self) -> bool {
        self.steps[self.position].is_ready()
    }

    fn compute(self: Rc<Self>, scheduler: &Scheduler) -> Result<(), Error> {
        self.steps[self.position].clone().compute(scheduler)?;

        let next = self.position + 1;
        match self.steps.len() - next {
            0 => {}
            1 => scheduler.schedule(self.steps[next].clone()),
            _ => scheduler.schedule(Rc::new(Self {
                steps: self.steps.clone(),
                position: next,
            })),
        }

        Ok(())
    }

    fn as_steps(&self) -> Option<&[ContinuationRef]> {
        Some(&self.steps[self.position..])
    }
}

/// Runs `steps` one after another.
///
/// Only the current step is visible to the scheduler, so a step that isn't
/// ready stalls the rest. Steps that are themselves sequences are spliced in
/// place.
pub fn sequence<I>(steps: I) -> ContinuationRef
where
    I: IntoIterator<Item = ContinuationRef>,
{
    let mut flattened: Vec<ContinuationRef> = vec![];

    for step in steps {
        if let Some(inner) = step.as_steps() {
            flattened.extend(inner.iter().cloned());
            continue;
        }
        flattened.push(step);
    }

    match flattened.len() {
        0 => no_op(),
        1 => flattened.swap_remove(0),
        _ => Rc::new(Sequence {
            steps: flattened.into(),
            position: 0,
        }),
    }
}

struct WhileLoop<C> {
    condition: RefCell<C>,
    body: ContinuationRef,
}

impl<C: FnMut() -> bool + 'static> Continuation for WhileLoop<C> {
    fn is_ready(&self) -> bool {
        true
    }

    fn compute(self: Rc<Self>, scheduler: &Scheduler) -> Result<(), Error> {
        if !(self.condition.borrow_mut())() {
            log::trace!("while_loop: condition false, exiting");
            return Ok(());
        }

        let body = self.body.clone();
        let this: ContinuationRef = self;
        scheduler.schedule(sequence([body, this]));

        Ok(())
    }
}

/// Repeats `body` while `condition` holds.
///
/// The condition is tested each time the loop itself is scheduled; every
/// iteration is a freshly scheduled `sequence(body, loop)`.
pub fn while_loop<C>(condition: C, body: ContinuationRef) -> ContinuationRef
where
    C: FnMut() -> bool + 'static,
{
    Rc::new(WhileLoop {
        condition: RefCell::new(condition),
        body,
    })
}

struct Select {
    clauses: RefCell<Vec<SelectClause>>,
    repeat: bool,
}

impl Continuation for Select {
    fn is_ready(&self) -> bool {
        self.clauses.borrow().iter().any(SelectClause::is_ready)
    }

    fn compute(self: Rc<Self>, scheduler: &Scheduler) -> Result<(), Error> {
        let proceed = scheduler.run_ready_clauses(&mut self.clauses.borrow_mut())?;

        if self.repeat && proceed {
            scheduler.schedule(self);
        }

        Ok(())
    }
}

fn build_select<I>(clauses: I, repeat: bool) -> ContinuationRef
where
    I: IntoIterator<Item = SelectClause>,
{
    Rc::new(Select {
        clauses: RefCell::new(clauses.into_iter().collect()),
        repeat,
    })
}

/// Waits until any clause is ready, then runs exactly one ready clause chosen
/// at random.
pub fn select<I>(clauses: I) -> ContinuationRef
where
    I: IntoIterator<Item = SelectClause>,
{
    build_select(clauses, false)
}

/// Like [`select`], but reschedules itself for as long as the chosen clause
/// reports `true`.
pub fn while_select<I>(clauses: I) -> ContinuationRef
where
    I: IntoIterator<Item = SelectClause>,
{
    build_select(clauses, true)
}
