//! Bounded, closable channels split into reading and writing views.
//!
//! A [`Channel`] owns one fixed-capacity ring buffer. [`Reading`] and
//! [`Writing`] are cheap handles onto that same buffer; cloning a handle never
//! copies the contents.
//!
//! Closing is a three-state machine. [`Writing::close`] moves an `Open`
//! channel to `Closing`: writes stop, buffered values still drain, and the
//! read side stays ready even when empty because it owes readers exactly one
//! close notification. The receive clause that delivers that notification
//! moves the channel to `Closed`, after which the read side is never ready
//! again.

use std::{cell::RefCell, rc::Rc};

use strum_macros::AsRefStr;

use crate::{
    Error, Outcome,
    select::{ClauseKind, Readiness, SelectClause},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum ClosingState {
    Open,
    Closing,
    Closed,
}

impl std::fmt::Display for ClosingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Illegal channel capacity: {0}. Must be greater than zero")]
    InvalidCapacity(usize),
    #[error("Channel is full")]
    Full,
    #[error("Can't put in state: {0}")]
    NotOpen(ClosingState),
    #[error("Channel is empty")]
    Empty,
    #[error("Channel is already {0}")]
    AlreadyClosed(ClosingState),
}

struct Core<T> {
    content: Box<[Option<T>]>,
    next_read: usize,
    next_write: usize,
    count: usize,
    state: ClosingState,
}

impl<T> Core<T> {
    fn new(capacity: usize) -> Result<Self, ChannelError> {
        // Nothing can suspend a writer, so every channel needs a slot.
        if capacity < 1 {
            return Err(ChannelError::InvalidCapacity(capacity));
        }

        Ok(Self {
            content: std::iter::repeat_with(|| None).take(capacity).collect(),
            next_read: 0,
            next_write: 0,
            count: 0,
            state: ClosingState::Open,
        })
    }

    const fn capacity(&self) -> usize {
        self.content.len()
    }

    fn readable(&self) -> bool {
        self.count > 0 || self.state == ClosingState::Closing
    }

    fn writable(&self) -> bool {
        self.count < self.capacity() && self.state == ClosingState::Open
    }

    fn put(&mut self, value: T) -> Result<(), ChannelError> {
        if self.state != ClosingState::Open {
            return Err(ChannelError::NotOpen(self.state));
        }
        if self.count == self.capacity() {
            return Err(ChannelError::Full);
        }

        self.content[self.next_write] = Some(value);
        self.next_write = (self.next_write + 1) % self.capacity();
        self.count += 1;

        Ok(())
    }

    fn get(&mut self) -> Result<T, ChannelError> {
        if self.count == 0 {
            return Err(ChannelError::Empty);
        }

        let value = self.content[self.next_read]
            .take()
            .ok_or(ChannelError::Empty)?;
        self.next_read = (self.next_read + 1) % self.capacity();
        self.count -= 1;

        Ok(value)
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        if self.state != ClosingState::Open {
            return Err(ChannelError::AlreadyClosed(self.state));
        }

        log::debug!("close: Open -> Closing count={}", self.count);
        self.state = ClosingState::Closing;

        Ok(())
    }

    /// Takes the next value, or `None` when this read consumes the owed close
    /// notification.
    fn receive(&mut self) -> Result<Option<T>, Error> {
        match self.state {
            ClosingState::Open => Ok(Some(self.get()?)),
            ClosingState::Closing if self.count > 0 => Ok(Some(self.get()?)),
            ClosingState::Closing => {
                log::debug!("receive: Closing -> Closed");
                self.state = ClosingState::Closed;
                Ok(None)
            }
            ClosingState::Closed => Err(Error::ReceiveAfterClose),
        }
    }
}

/// A bounded FIFO channel.
pub struct Channel<T> {
    core: Rc<RefCell<Core<T>>>,
}

impl<T> Channel<T> {
    /// # Errors
    ///
    /// * If `capacity` is `0`
    pub fn bounded(capacity: usize) -> Result<Self, ChannelError> {
        log::trace!("bounded: capacity={capacity}");
        Ok(Self {
            core: Rc::new(RefCell::new(Core::new(capacity)?)),
        })
    }

    #[must_use]
    pub fn reading(&self) -> Reading<T> {
        Reading {
            core: self.core.clone(),
        }
    }

    #[must_use]
    pub fn writing(&self) -> Writing<T> {
        Writing {
            core: self.core.clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.core.borrow().count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.core.borrow().capacity()
    }

    #[must_use]
    pub fn state(&self) -> ClosingState {
        self.core.borrow().state
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

fn debug_core<T>(
    name: &str,
    core: &RefCell<Core<T>>,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    let core = core.borrow();
    f.debug_struct(name)
        .field("count", &core.count)
        .field("capacity", &core.capacity())
        .field("state", &core.state)
        .finish_non_exhaustive()
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        debug_core("Channel", &self.core, f)
    }
}

/// The receiving side of a [`Channel`].
pub struct Reading<T> {
    core: Rc<RefCell<Core<T>>>,
}

impl<T> Reading<T> {
    /// Whether a receive clause on this side may run: a value is buffered or
    /// the close notification is still owed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.core.borrow().readable()
    }

    /// Removes the oldest buffered value.
    ///
    /// Prefer [`Reading::on_receive`] inside a `select`; this does not
    /// participate in the close protocol.
    ///
    /// # Errors
    ///
    /// * If the channel is empty
    pub fn get(&self) -> Result<T, ChannelError> {
        let value = self.core.borrow_mut().get()?;
        log::trace!("get");
        Ok(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.core.borrow().count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn state(&self) -> ClosingState {
        self.core.borrow().state
    }

    fn receive(&self) -> Result<Option<T>, Error> {
        self.core.borrow_mut().receive()
    }
}

impl<T: 'static> Reading<T> {
    /// Builds a clause that hands the next value to `receiver`.
    ///
    /// When the clause consumes the close notification instead of a value,
    /// `receiver` is not called and the clause reports `false`, ending an
    /// enclosing [`while_select`](crate::while_select).
    #[must_use]
    pub fn on_receive<F, R>(&self, mut receiver: F) -> SelectClause
    where
        F: FnMut(T) -> R + 'static,
        R: Outcome,
    {
        let reading = self.clone();
        SelectClause::new(ClauseKind::Receive, self.clone(), move || {
            match reading.receive()? {
                Some(value) => receiver(value).into_outcome(),
                None => Ok(false),
            }
        })
    }

    /// Builds a clause that hands `receiver` either the next value or, once
    /// the channel is closed and drained, `None`.
    ///
    /// `None` is delivered exactly once.
    #[must_use]
    pub fn on_receive_or_closed<F, R>(&self, mut receiver: F) -> SelectClause
    where
        F: FnMut(Option<T>) -> R + 'static,
        R: Outcome,
    {
        let reading = self.clone();
        SelectClause::new(ClauseKind::ReceiveOrClosed, self.clone(), move || {
            receiver(reading.receive()?).into_outcome()
        })
    }
}

impl<T> Clone for Reading<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> Readiness for Reading<T> {
    fn is_ready(&self) -> bool {
        Self::is_ready(self)
    }
}

impl<T> std::fmt::Debug for Reading<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        debug_core("Reading", &self.core, f)
    }
}

/// The sending side of a [`Channel`].
pub struct Writing<T> {
    core: Rc<RefCell<Core<T>>>,
}

impl<T> Writing<T> {
    /// Whether a send clause on this side may run: the channel is open and has
    /// room.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.core.borrow().writable()
    }

    /// Appends `value`.
    ///
    /// # Errors
    ///
    /// * If the channel is full
    /// * If the channel is no longer open
    pub fn put(&self, value: T) -> Result<(), ChannelError> {
        self.core.borrow_mut().put(value)?;
        log::trace!("put");
        Ok(())
    }

    /// Stops further writes. Buffered values still drain, followed by one
    /// close notification to readers.
    ///
    /// # Errors
    ///
    /// * If the channel was already closed
    pub fn close(&self) -> Result<(), ChannelError> {
        self.core.borrow_mut().close()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.core.borrow().count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn state(&self) -> ClosingState {
        self.core.borrow().state
    }
}

impl<T: 'static> Writing<T> {
    /// Builds a clause that calls `receiver` with this side once there is
    /// room. `receiver` performs the actual [`Writing::put`].
    #[must_use]
    pub fn on_send<F, R>(&self, mut receiver: F) -> SelectClause
    where
        F: FnMut(&Self) -> R + 'static,
        R: Outcome,
    {
        let writing = self.clone();
        SelectClause::new(ClauseKind::Send, self.clone(), move || {
            receiver(&writing).into_outcome()
        })
    }
}

impl<T> Clone for Writing<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> Readiness for Writing<T> {
    fn is_ready(&self) -> bool {
        Self::is_ready(self)
    }
}

impl<T> std::fmt::Debug for Writing<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        debug_core("Writing", &self.core, f)
    }
}
