//! Select clauses: one channel side bound to the action that uses it.
//!
//! Readiness and action are kept apart so a select can test every clause
//! cheaply and then commit to exactly one side effect.

use strum_macros::AsRefStr;

use crate::Error;

/// Something that can report whether an operation on it would succeed now.
pub trait Readiness {
    fn is_ready(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum ClauseKind {
    Receive,
    ReceiveOrClosed,
    Send,
}

impl std::fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

type Action = Box<dyn FnMut() -> Result<bool, Error>>;

/// A channel side paired with the action to run when it is ready.
///
/// Built by [`Reading::on_receive`](crate::Reading::on_receive),
/// [`Reading::on_receive_or_closed`](crate::Reading::on_receive_or_closed) and
/// [`Writing::on_send`](crate::Writing::on_send).
pub struct SelectClause {
    kind: ClauseKind,
    side: Box<dyn Readiness>,
    action: Action,
}

impl SelectClause {
    pub(crate) fn new(
        kind: ClauseKind,
        side: impl Readiness + 'static,
        action: impl FnMut() -> Result<bool, Error> + 'static,
    ) -> Self {
        Self {
            kind,
            side: Box::new(side),
            action: Box::new(action),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ClauseKind {
        self.kind
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.side.is_ready()
    }

    /// Runs the action and returns its continue-signal.
    ///
    /// # Errors
    ///
    /// * If the channel side isn't ready
    /// * If the action fails
    pub fn attempt(&mut self) -> Result<bool, Error> {
        if !self.is_ready() {
            return Err(Error::ClauseNotReady(self.kind));
        }
        log::trace!("attempt: kind={}", self.kind);
        (self.action)()
    }
}

impl std::fmt::Debug for SelectClause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectClause")
            .field("kind", &self.kind)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use pretty_assertions::assert_eq;

    use crate::{Channel, ChannelError};

    use super::*;

    #[test_log::test]
    fn receive_clause_not_ready_on_empty_channel() {
        let channel = Channel::<u8>::bounded(1).unwrap();
        let mut clause = channel.reading().on_receive(|_| ());

        assert!(!clause.is_ready());
        assert!(matches!(
            clause.attempt(),
            Err(Error::ClauseNotReady(ClauseKind::Receive))
        ));
    }

    #[test_log::test]
    fn send_clause_not_ready_on_full_channel() {
        let channel = Channel::bounded(1).unwrap();
        channel.writing().put(1).unwrap();
        let mut clause = channel.writing().on_send(|w| w.put(2));

        assert!(matches!(
            clause.attempt(),
            Err(Error::ClauseNotReady(ClauseKind::Send))
        ));
        assert_eq!(channel.len(), 1);
    }

    #[test_log::test]
    fn receiver_signal_is_returned() {
        let channel = Channel::bounded(2).unwrap();
        channel.writing().put(1).unwrap();
        channel.writing().put(2).unwrap();
        let mut clause = channel.reading().on_receive(|value: i32| value < 2);

        assert!(clause.attempt().unwrap());
        assert!(!clause.attempt().unwrap());
    }

    #[test_log::test]
    fn send_receiver_error_propagates() {
        let channel = Channel::bounded(1).unwrap();
        let mut clause = channel.writing().on_send(|w| {
            w.put(1)?;
            w.put(2)
        });

        assert!(matches!(
            clause.attempt(),
            Err(Error::Channel(ChannelError::Full))
        ));
    }

    #[test_log::test]
    fn receive_clause_reports_close_without_calling_receiver() {
        let channel = Channel::<u8>::bounded(1).unwrap();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut clause = channel
            .reading()
            .on_receive(move |_| counter.set(counter.get() + 1));

        channel.writing().close().unwrap();

        assert!(!clause.attempt().unwrap());
        assert_eq!(calls.get(), 0);
        assert!(!clause.is_ready());
    }

    #[test_log::test]
    fn debug_includes_kind_and_readiness() {
        let channel = Channel::<u8>::bounded(1).unwrap();
        let clause = channel.writing().on_send(|_| ());

        assert_eq!(
            format!("{clause:?}"),
            "SelectClause { kind: Send, ready: true, .. }"
        );
    }
}
