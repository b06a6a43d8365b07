//! Message publishing/subscription abstraction (mechanics only).
//!
//! The bus distributes commands to handlers and events to sagas. It makes
//! minimal assumptions:
//!
//! - **At-least-once delivery**: a message may be delivered more than once;
//!   every consumer must be idempotent
//! - **No ordering guarantees** between publishers
//! - **No persistence**: aggregates are the source of truth, the bus only
//!   carries the next step
//!
//! Redelivery after a failed or postponed handling is the worker's job: it
//! republishes the same envelope after the requested delay.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

/// A subscription to a message stream.
///
/// Each subscription gets a copy of every message published after it was
/// created (broadcast semantics). Subscriptions are meant for a single
/// consuming task.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Transport-agnostic message bus (pub/sub abstraction).
///
/// `publish()` can fail (e.g. the transport is unavailable). Failures are
/// surfaced to the caller, which decides whether to retry; publishing is
/// always safe to repeat because consumers are idempotent.
pub trait MessageBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> MessageBus<M> for Arc<B>
where
    B: MessageBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
