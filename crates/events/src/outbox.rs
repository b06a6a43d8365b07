//! Messages produced while handling one inbound message.
//!
//! Handlers and sagas never publish directly. They push into an [`Outbox`]
//! and the worker publishes its content only after handling returned `Ok`,
//! so a failed attempt (e.g. an optimistic-concurrency conflict on save)
//! never leaks a command for a state that was not persisted.

/// Ordered buffer of outgoing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbox<M> {
    messages: Vec<M>,
}

impl<M> Default for Outbox<M> {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
        }
    }
}

impl<M> Outbox<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<M>) {
        self.messages.push(message.into());
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<M> {
        self.messages
    }
}
