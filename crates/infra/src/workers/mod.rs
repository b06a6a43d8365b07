//! Background workers consuming the command and event buses.

mod message_worker;

use async_trait::async_trait;

use txexec_events::{
    Command, CommandHandler, CommandHandlingResult, Event, HandlingError, Outbox, Saga,
};

pub use message_worker::{MessageWorker, WorkerHandle, WorkerOptions, WorkerStats};

/// What a worker runs for every delivered message.
#[async_trait]
pub trait Consumer: Send + Sync + 'static {
    type In: Clone + core::fmt::Debug + Send + Sync + 'static;
    type Out: Clone + Send + Sync + 'static;

    /// Stable message name for logs.
    fn message_type(message: &Self::In) -> &'static str;

    async fn consume(
        &self,
        message: &Self::In,
        outbox: &mut Outbox<Self::Out>,
    ) -> Result<CommandHandlingResult, HandlingError>;
}

/// Runs a command handler.
pub struct CommandConsumer<H>(pub H);

#[async_trait]
impl<H> Consumer for CommandConsumer<H>
where
    H: CommandHandler + 'static,
{
    type In = H::Cmd;
    type Out = H::Ev;

    fn message_type(message: &H::Cmd) -> &'static str {
        message.command_type()
    }

    async fn consume(
        &self,
        message: &H::Cmd,
        outbox: &mut Outbox<H::Ev>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        self.0.handle(message, outbox).await
    }
}

/// Runs a saga; a successful reaction is always `Handled`.
pub struct SagaConsumer<S>(pub S);

#[async_trait]
impl<S: Saga> Consumer for SagaConsumer<S> {
    type In = S::Ev;
    type Out = S::Cmd;

    fn message_type(message: &S::Ev) -> &'static str {
        message.event_type()
    }

    async fn consume(
        &self,
        message: &S::Ev,
        outbox: &mut Outbox<S::Cmd>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        self.0.handle(message, outbox).await?;
        Ok(CommandHandlingResult::Handled)
    }
}
