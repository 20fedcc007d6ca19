#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! A register shared by several mutators, each doing read, increment, write.
//!
//! Serving one request at a time keeps every increment. Letting the register
//! answer reads while a write is outstanding loses some, and sweeping seeds
//! is how that shows up.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use braid::{
    Builder, ContinuationRef, Error, Reading, Scheduler, Writing, select, sequence, statement,
    while_loop, while_select,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Serves one read-increment-write at a time.
    Serialized,
    /// Answers reads while a write is still outstanding.
    Racy,
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Serialized => "serialized",
            Self::Racy => "racy",
        })
    }
}

/// A write the register received that didn't follow from its current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LostUpdate {
    pub expected: u32,
    pub written: u32,
}

#[derive(Debug)]
pub struct Report {
    pub value: u32,
    pub steps: usize,
    /// Read-increment-write rounds the mutators finished.
    pub completed: usize,
    pub lost_updates: Vec<LostUpdate>,
}

#[derive(Default)]
struct State {
    value: Rc<Cell<u32>>,
    completed: Rc<Cell<usize>>,
    lost_updates: Rc<RefCell<Vec<LostUpdate>>>,
}

fn respond(scheduler: &Scheduler, state: &State) -> impl FnMut(Writing<u32>) + 'static {
    let scheduler = scheduler.clone();
    let value = state.value.clone();
    move |respond_to: Writing<u32>| {
        log::trace!("register: responding with {}", value.get());
        // The response channel may be full, so the reply waits for its own turn.
        let value = value.clone();
        scheduler.schedule(select([respond_to.on_send(move |w| w.put(value.get()))]));
    }
}

fn store(state: &State) -> impl FnMut(u32) + 'static {
    let value = state.value.clone();
    let lost_updates = state.lost_updates.clone();
    move |written| {
        let expected = value.get() + 1;
        if written != expected {
            log::debug!("register: lost update, expected={expected} written={written}");
            lost_updates
                .borrow_mut()
                .push(LostUpdate { expected, written });
        }
        value.set(written);
    }
}

fn register(
    kind: Register,
    scheduler: &Scheduler,
    state: &State,
    requests: &Reading<Writing<u32>>,
    writes: &Reading<u32>,
) -> ContinuationRef {
    match kind {
        Register::Serialized => while_loop(
            || true,
            sequence([
                select([requests.on_receive(respond(scheduler, state))]),
                select([writes.on_receive(store(state))]),
            ]),
        ),
        Register::Racy => while_select([
            requests.on_receive(respond(scheduler, state)),
            writes.on_receive(store(state)),
        ]),
    }
}

fn mutator(
    id: usize,
    scheduler: &Scheduler,
    state: &State,
    requests: &Writing<Writing<u32>>,
    writes: &Writing<u32>,
    mutations: usize,
) -> Result<ContinuationRef, Error> {
    let responses = scheduler.create_bounded_channel::<u32>(1)?;
    let reply_to = responses.writing();
    let recent = Rc::new(Cell::new(0));
    let iteration = Rc::new(Cell::new(0));

    let (observed, to_write) = (recent.clone(), recent);
    let (test, step) = (iteration.clone(), iteration);
    let completed = state.completed.clone();

    Ok(while_loop(
        move || test.get() < mutations,
        sequence([
            select([requests.on_send(move |w| w.put(reply_to.clone()))]),
            select([responses.reading().on_receive(move |value| {
                log::trace!("mutator {id}: read {value}");
                observed.set(value);
            })]),
            select([writes.on_send(move |w| w.put(to_write.get() + 1))]),
            statement(move || {
                step.set(step.get() + 1);
                completed.set(completed.get() + 1);
            }),
        ]),
    ))
}

/// Runs one register against `mutators` mutators under `seed`.
///
/// # Errors
///
/// * If the scheduler fails
pub fn simulate(
    seed: u64,
    kind: Register,
    mutators: usize,
    mutations: usize,
) -> Result<Report, Error> {
    let scheduler = Builder::new().seed(seed).build();
    let requests = scheduler.create_bounded_channel::<Writing<u32>>(1)?;
    let writes = scheduler.create_bounded_channel::<u32>(1)?;
    let state = State::default();

    scheduler.schedule(register(
        kind,
        &scheduler,
        &state,
        &requests.reading(),
        &writes.reading(),
    ));

    for id in 0..mutators {
        scheduler.schedule(mutator(
            id,
            &scheduler,
            &state,
            &requests.writing(),
            &writes.writing(),
            mutations,
        )?);
    }

    let steps = scheduler.run()?;

    Ok(Report {
        value: state.value.get(),
        steps,
        completed: state.completed.get(),
        lost_updates: state.lost_updates.take(),
    })
}
