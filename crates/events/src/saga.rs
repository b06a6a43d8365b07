//! Saga / process manager contract (mechanics only, no business rules).
//!
//! A saga reacts to events by loading the aggregate it orchestrates, letting
//! the aggregate's state table validate the event, persisting the aggregate
//! and emitting the next command into the outbox.
//!
//! Design notes:
//! - A saga instance is identified by the aggregate id carried in the event
//! - Replays are recognized by the state table (ignore rules), never by the
//!   saga itself
//! - Commands are pushed before the aggregate is saved; the worker publishes
//!   them only after the whole reaction succeeded

use async_trait::async_trait;

use crate::{Command, Event, HandlingError, Outbox};

#[async_trait]
pub trait Saga: Send + Sync + 'static {
    type Ev: Event;
    type Cmd: Command;

    /// Stable saga type identifier (used in logs).
    fn saga_type(&self) -> &'static str;

    /// React to one incoming event. Events the saga does not orchestrate are
    /// accepted and dropped.
    async fn handle(
        &self,
        event: &Self::Ev,
        outbox: &mut Outbox<Self::Cmd>,
    ) -> Result<(), HandlingError>;
}
