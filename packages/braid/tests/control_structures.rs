use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use braid::{
    Builder, ContinuationRef, Error, no_op, select, sequence, statement, while_loop,
};
use pretty_assertions::assert_eq;

type Log = Rc<RefCell<Vec<&'static str>>>;

fn record(log: &Log, entry: &'static str) -> ContinuationRef {
    let log = log.clone();
    statement(move || log.borrow_mut().push(entry))
}

#[test_log::test]
fn sequence_runs_in_order() -> Result<(), Error> {
    let scheduler = Builder::new().seed(5).build();
    let log = Log::default();

    scheduler.schedule(sequence([
        record(&log, "one"),
        record(&log, "two"),
        record(&log, "three"),
    ]));

    assert_eq!(scheduler.trigger_actions()?, 3);
    assert_eq!(*log.borrow(), vec!["one", "two", "three"]);

    Ok(())
}

#[test_log::test]
fn nested_sequences_run_in_order() -> Result<(), Error> {
    let scheduler = Builder::new().build();
    let log = Log::default();

    scheduler.schedule(sequence([
        sequence([record(&log, "a"), record(&log, "b")]),
        no_op(),
        sequence([record(&log, "c"), sequence([record(&log, "d")])]),
    ]));

    assert_eq!(scheduler.trigger_actions()?, 4);
    assert_eq!(*log.borrow(), vec!["a", "b", "c", "d"]);

    Ok(())
}

#[test_log::test]
fn blocked_head_stalls_sequence() -> Result<(), Error> {
    let scheduler = Builder::new().build();
    let channel = scheduler.create_bounded_channel::<&'static str>(1)?;
    let log = Log::default();

    let sink = log.clone();
    scheduler.schedule(sequence([
        select([channel
            .reading()
            .on_receive(move |value| sink.borrow_mut().push(value))]),
        record(&log, "after"),
    ]));

    assert_eq!(scheduler.trigger_actions()?, 0);
    assert!(log.borrow().is_empty());

    channel.writing().put("received")?;
    scheduler.trigger_actions()?;

    assert_eq!(*log.borrow(), vec!["received", "after"]);
    assert!(scheduler.is_idle());

    Ok(())
}

#[test_log::test]
fn while_loop_counts_iterations() -> Result<(), Error> {
    let scheduler = Builder::new().build();
    let iterations = Rc::new(Cell::new(0));

    let (test, body) = (iterations.clone(), iterations.clone());
    scheduler.schedule(while_loop(
        move || test.get() < 5,
        statement(move || body.set(body.get() + 1)),
    ));

    scheduler.trigger_actions()?;

    assert_eq!(iterations.get(), 5);
    assert!(scheduler.is_idle());

    Ok(())
}

#[test_log::test]
fn while_loop_with_sequence_body() -> Result<(), Error> {
    let scheduler = Builder::new().seed(9).build();
    let log = Log::default();
    let remaining = Rc::new(Cell::new(2));

    let test = remaining.clone();
    let countdown = remaining.clone();
    scheduler.schedule(while_loop(
        move || test.get() > 0,
        sequence([
            record(&log, "first"),
            record(&log, "second"),
            statement(move || countdown.set(countdown.get() - 1)),
        ]),
    ));

    scheduler.trigger_actions()?;

    assert_eq!(*log.borrow(), vec!["first", "second", "first", "second"]);
    assert_eq!(remaining.get(), 0);

    Ok(())
}

#[test_log::test]
fn while_loop_false_at_start_never_runs_body() -> Result<(), Error> {
    let scheduler = Builder::new().build();
    let log = Log::default();

    scheduler.schedule(while_loop(|| false, record(&log, "body")));

    assert_eq!(scheduler.trigger_actions()?, 1);
    assert!(log.borrow().is_empty());

    Ok(())
}

#[test_log::test]
fn two_programs_interleave_but_keep_own_order() -> Result<(), Error> {
    for seed in 0..16 {
        let scheduler = Builder::new().seed(seed).build();
        let log = Log::default();

        scheduler.schedule(sequence([record(&log, "a1"), record(&log, "a2")]));
        scheduler.schedule(sequence([record(&log, "b1"), record(&log, "b2")]));
        scheduler.trigger_actions()?;

        let log = log.borrow();
        let position = |entry| log.iter().position(|x| *x == entry);
        assert_eq!(log.len(), 4);
        assert!(position("a1") < position("a2"));
        assert!(position("b1") < position("b2"));
    }

    Ok(())
}
