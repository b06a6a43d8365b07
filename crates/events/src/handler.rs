use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use txexec_core::UnexpectedEventError;

use crate::{Command, Event, Outbox};

/// Successful outcome of handling one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandHandlingResult {
    /// The step is done; its outcome event (if any) is in the outbox.
    Handled,
    /// The step could not be done yet; redeliver the command after the delay.
    RetryAfter(Duration),
}

impl CommandHandlingResult {
    pub fn retry_after(delay: Duration) -> Self {
        Self::RetryAfter(delay)
    }
}

/// Errors that cross the handler/saga boundary.
///
/// Domain-expected failures never show up here: they are reported as events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlingError {
    /// The state table rejected an event. Indicates a missing ignore rule or
    /// corrupted state; retried after a short fixed delay and logged loudly.
    #[error(transparent)]
    UnexpectedEvent(#[from] UnexpectedEventError),

    /// Infrastructure failure (store, lock store, adapter). Retried after the
    /// default delay.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl HandlingError {
    pub fn transient(err: impl core::fmt::Display) -> Self {
        Self::Transient(err.to_string())
    }

    pub fn is_defect(&self) -> bool {
        matches!(self, Self::UnexpectedEvent(_))
    }
}

/// Performs one side effect for a command and reports the outcome.
///
/// Handlers are stateless with respect to the workflow: they hold no
/// orchestration logic and never decide which step comes next.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    type Cmd: Command;
    type Ev: Event;

    async fn handle(
        &self,
        command: &Self::Cmd,
        outbox: &mut Outbox<Self::Ev>,
    ) -> Result<CommandHandlingResult, HandlingError>;
}
