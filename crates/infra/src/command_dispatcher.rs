//! Routes every executor command to the handler method for its step.
//!
//! The dispatcher is the single [`CommandHandler`] the command worker runs.
//! It holds no logic of its own beyond routing and a debug trace per
//! command; outcome events land in the caller's outbox.

use async_trait::async_trait;
use tracing::debug;

use txexec_events::{Command, CommandHandler, CommandHandlingResult, HandlingError, Outbox};
use txexec_execution::{ExecutorCommand, ExecutorEvent};

use crate::handlers::{OperationCommandHandler, TransactionCommandHandler};

pub struct CommandDispatcher {
    operations: OperationCommandHandler,
    transactions: TransactionCommandHandler,
}

impl CommandDispatcher {
    pub fn new(
        operations: OperationCommandHandler,
        transactions: TransactionCommandHandler,
    ) -> Self {
        Self {
            operations,
            transactions,
        }
    }
}

#[async_trait]
impl CommandHandler for CommandDispatcher {
    type Cmd = ExecutorCommand;
    type Ev = ExecutorEvent;

    async fn handle(
        &self,
        command: &ExecutorCommand,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        debug!(
            command_type = command.command_type(),
            operation_id = %command.operation_id(),
            "handling command"
        );

        match command {
            ExecutorCommand::StartOperationExecution(c) => self.operations.start(c, outbox).await,
            ExecutorCommand::StartOneToManyOperationExecution(c) => {
                self.operations.start_one_to_many(c, outbox).await
            }
            ExecutorCommand::GenerateActiveTransactionId(c) => {
                self.operations.generate_active_transaction_id(c, outbox).await
            }
            ExecutorCommand::StartTransactionExecution(c) => {
                self.operations.start_transaction(c, outbox).await
            }
            ExecutorCommand::NotifyOperationExecutionCompleted(c) => {
                self.operations.notify_completed(c, outbox).await
            }
            ExecutorCommand::NotifyOperationExecutionFailed(c) => {
                self.operations.notify_failed(c, outbox).await
            }
            ExecutorCommand::LockSourceAddress(c) => {
                self.transactions.lock_source_address(c, outbox).await
            }
            ExecutorCommand::BuildTransaction(c) => self.transactions.build(c, outbox).await,
            ExecutorCommand::SignTransaction(c) => self.transactions.sign(c, outbox).await,
            ExecutorCommand::BroadcastTransaction(c) => {
                self.transactions.broadcast(c, outbox).await
            }
            ExecutorCommand::ReleaseSourceAddressLock(c) => {
                self.transactions.release_source_address_lock(c, outbox).await
            }
            ExecutorCommand::StartWaitingForTransactionEnding(c) => {
                self.transactions.start_waiting_for_ending(c, outbox).await
            }
            ExecutorCommand::WaitForTransactionEnding(c) => {
                self.transactions.wait_for_ending(c, outbox).await
            }
            ExecutorCommand::ClearBroadcastedTransaction(c) => {
                self.transactions.clear_broadcasted(c, outbox).await
            }
        }
    }
}
