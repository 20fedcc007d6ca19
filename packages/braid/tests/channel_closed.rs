use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use braid::{Builder, ChannelError, ClosingState, Error, select, sequence, while_select};
use pretty_assertions::assert_eq;

#[test_log::test]
fn close_drains_then_signals_once() {
    let scheduler = Builder::new().build();
    let channel = scheduler.create_bounded_channel(1).unwrap();
    let (reading, writing) = (channel.reading(), channel.writing());

    writing.put(1).unwrap();
    writing.close().unwrap();

    let results = Rc::new(RefCell::new(vec![]));
    let invoked_after_close = Rc::new(Cell::new(false));

    let (first, second, third) = (results.clone(), results.clone(), invoked_after_close.clone());
    scheduler.schedule(sequence([
        select([reading.on_receive_or_closed(move |value| {
            first.borrow_mut().push(value);
        })]),
        select([reading.on_receive_or_closed(move |value| {
            second.borrow_mut().push(value);
        })]),
        select([reading.on_receive_or_closed(move |_| third.set(true))]),
    ]));

    assert_eq!(scheduler.trigger_actions().unwrap(), 2);

    assert_eq!(*results.borrow(), vec![Some(1), None]);
    assert!(!invoked_after_close.get());
    assert_eq!(channel.state(), ClosingState::Closed);
    assert_eq!(scheduler.pending(), 1);
}

#[test_log::test]
fn closing_is_ready_only_for_reading() {
    let channel = Builder::new()
        .build()
        .create_bounded_channel::<u8>(2)
        .unwrap();

    channel.writing().close().unwrap();

    assert!(channel.reading().is_ready());
    assert!(!channel.writing().is_ready());
    assert!(matches!(
        channel.writing().put(1),
        Err(ChannelError::NotOpen(ClosingState::Closing))
    ));
}

#[test_log::test]
fn second_close_is_rejected() {
    let channel = Builder::new()
        .build()
        .create_bounded_channel::<u8>(1)
        .unwrap();
    let writing = channel.writing();

    writing.close().unwrap();

    assert!(matches!(
        writing.close(),
        Err(ChannelError::AlreadyClosed(ClosingState::Closing))
    ));
}

#[test_log::test]
fn while_select_receives_until_close() -> Result<(), Error> {
    let scheduler = Builder::new().seed(3).build();
    let channel = scheduler.create_bounded_channel(2).unwrap();
    let writing = channel.writing();
    let received = Rc::new(RefCell::new(vec![]));

    let sink = received.clone();
    scheduler.schedule(while_select([channel
        .reading()
        .on_receive(move |value: u32| sink.borrow_mut().push(value))]));

    writing.put(1).unwrap();
    writing.put(2).unwrap();
    scheduler.trigger_actions()?;

    writing.put(3).unwrap();
    writing.close().unwrap();
    scheduler.trigger_actions()?;

    assert_eq!(*received.borrow(), vec![1, 2, 3]);
    assert!(scheduler.is_idle());
    assert_eq!(channel.state(), ClosingState::Closed);

    Ok(())
}

#[test_log::test]
fn producer_and_consumer_finish_on_close() -> Result<(), Error> {
    let scheduler = Builder::new().seed(11).build();
    let channel = scheduler.create_bounded_channel(1).unwrap();
    let total = Rc::new(Cell::new(0_u32));

    let next = Rc::new(Cell::new(1_u32));
    scheduler.schedule(while_select([channel.writing().on_send(move |w| {
        let value = next.get();
        if value > 4 {
            w.close()?;
            return Ok::<_, ChannelError>(false);
        }
        w.put(value)?;
        next.set(value + 1);
        Ok(true)
    })]));

    let sum = total.clone();
    scheduler.schedule(while_select([channel.reading().on_receive_or_closed(
        move |value: Option<u32>| {
            value.inspect(|value| sum.set(sum.get() + value)).is_some()
        },
    )]));

    scheduler.run()?;

    assert_eq!(total.get(), 10);
    assert!(scheduler.is_idle());

    Ok(())
}
