use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use txexec_core::{OperationId, TransactionId};
use txexec_events::{CommandHandlingResult, HandlingError, Outbox};
use txexec_execution::commands::{
    BroadcastTransaction, BuildTransaction, ClearBroadcastedTransaction, LockSourceAddress,
    ReleaseSourceAddressLock, SignTransaction, StartWaitingForTransactionEnding,
    WaitForTransactionEnding,
};
use txexec_execution::events::{
    BroadcastedTransactionCleared, SourceAddressLockReleased, SourceAddressLocked,
    TransactionBroadcasted, TransactionBuildingRejected, TransactionBuilt,
    TransactionEndingWaitingStarted, TransactionExecutionCompleted, TransactionExecutionFailed,
    TransactionExecutionRepeatRequested, TransactionSigned,
};
use txexec_execution::{
    BroadcastOutcome, BuildOutcome, ExecutorEvent, OperationExecution, TransactionEnding,
    TransactionExecutionErrorCode,
};

use crate::adapters::{BlockchainAdapter, BuildRequest};
use crate::config::RetryDelays;
use crate::locking::{LockRequest, LockingPolicies};
use crate::repository::AggregateRepository;

/// Handles the steps of one transaction attempt.
pub struct TransactionCommandHandler {
    policies: Arc<LockingPolicies>,
    adapter: Arc<dyn BlockchainAdapter>,
    operations: Arc<dyn AggregateRepository<OperationExecution>>,
    retry: RetryDelays,
}

/// How a failed step is reported.
enum Failure {
    Failed(TransactionExecutionErrorCode, String),
    RepeatRequested(String),
    NotEnoughBalance,
}

impl TransactionCommandHandler {
    pub fn new(
        policies: Arc<LockingPolicies>,
        adapter: Arc<dyn BlockchainAdapter>,
        operations: Arc<dyn AggregateRepository<OperationExecution>>,
        retry: RetryDelays,
    ) -> Self {
        Self {
            policies,
            adapter,
            operations,
            retry,
        }
    }

    pub async fn lock_source_address(
        &self,
        command: &LockSourceAddress,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        let policy = self.policies.for_blockchain(&command.blockchain_type);
        let request = LockRequest {
            transaction_id: command.transaction_id,
            blockchain_type: &command.blockchain_type,
            from_address: &command.from_address,
            outputs: &command.outputs,
        };

        if !policy.acquire(request).await.map_err(HandlingError::transient)? {
            debug!(
                transaction_id = %command.transaction_id,
                from_address = %command.from_address,
                "source address is locked by another transaction"
            );
            return Ok(CommandHandlingResult::retry_after(
                self.retry.address_lock_contention_delay(),
            ));
        }

        outbox.push(SourceAddressLocked {
            operation_id: command.operation_id,
            transaction_id: command.transaction_id,
            locking: policy.mode(),
            occurred_at: Utc::now(),
        });
        Ok(CommandHandlingResult::Handled)
    }

    pub async fn build(
        &self,
        command: &BuildTransaction,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        let operation = self
            .operations
            .get(&command.operation_id)
            .await
            .map_err(HandlingError::transient)?;

        if operation.state().is_finished()
            || !operation.is_active_transaction(command.transaction_id)
        {
            info!(
                operation_id = %command.operation_id,
                transaction_id = %command.transaction_id,
                active_transaction_id = ?operation.active_transaction_id(),
                operation_state = ?operation.state(),
                "transaction was superseded, building rejected"
            );
            outbox.push(TransactionBuildingRejected {
                operation_id: command.operation_id,
                transaction_id: command.transaction_id,
                occurred_at: Utc::now(),
            });
            return Ok(CommandHandlingResult::Handled);
        }

        let outcome = self
            .adapter
            .build(BuildRequest {
                transaction_id: command.transaction_id,
                blockchain_type: &command.blockchain_type,
                blockchain_asset_id: &command.blockchain_asset_id,
                from_address: &command.from_address,
                outputs: &command.outputs,
                include_fee: command.include_fee,
            })
            .await
            .map_err(HandlingError::transient)?;

        let failure = match outcome {
            BuildOutcome::Built {
                transaction_context,
                source_address_context,
            } => {
                outbox.push(TransactionBuilt {
                    operation_id: command.operation_id,
                    transaction_id: command.transaction_id,
                    transaction_context,
                    source_address_context,
                    occurred_at: Utc::now(),
                });
                return Ok(CommandHandlingResult::Handled);
            }
            BuildOutcome::AmountIsTooSmall => Failure::Failed(
                TransactionExecutionErrorCode::AmountIsTooSmall,
                "amount is too small".to_string(),
            ),
            BuildOutcome::NotEnoughBalance => Failure::NotEnoughBalance,
            BuildOutcome::RebuildRequired => {
                Failure::RepeatRequested("transaction rebuilding is required".to_string())
            }
            BuildOutcome::Failed { message } => {
                Failure::Failed(TransactionExecutionErrorCode::Unknown, message)
            }
        };

        Ok(self.report(
            failure,
            command.operation_id,
            command.transaction_id,
            command.transaction_number,
            outbox,
        ))
    }

    pub async fn sign(
        &self,
        command: &SignTransaction,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        let signed_transaction = self
            .adapter
            .sign(
                &command.blockchain_type,
                &command.signer_address,
                &command.transaction_context,
            )
            .await
            .map_err(HandlingError::transient)?;

        outbox.push(TransactionSigned {
            operation_id: command.operation_id,
            transaction_id: command.transaction_id,
            signed_transaction,
            occurred_at: Utc::now(),
        });
        Ok(CommandHandlingResult::Handled)
    }

    pub async fn broadcast(
        &self,
        command: &BroadcastTransaction,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        let outcome = self
            .adapter
            .broadcast(
                command.transaction_id,
                &command.blockchain_type,
                &command.signed_transaction,
            )
            .await
            .map_err(HandlingError::transient)?;

        let failure = match outcome {
            BroadcastOutcome::Broadcasted | BroadcastOutcome::AlreadyBroadcasted => {
                outbox.push(TransactionBroadcasted {
                    operation_id: command.operation_id,
                    transaction_id: command.transaction_id,
                    occurred_at: Utc::now(),
                });
                return Ok(CommandHandlingResult::Handled);
            }
            BroadcastOutcome::AmountIsTooSmall => Failure::Failed(
                TransactionExecutionErrorCode::AmountIsTooSmall,
                "amount is too small".to_string(),
            ),
            BroadcastOutcome::NotEnoughBalance => Failure::NotEnoughBalance,
            BroadcastOutcome::RebuildRequired => {
                Failure::RepeatRequested("transaction rebuilding is required".to_string())
            }
            BroadcastOutcome::Failed { message } => {
                Failure::Failed(TransactionExecutionErrorCode::Unknown, message)
            }
        };

        Ok(self.report(
            failure,
            command.operation_id,
            command.transaction_id,
            command.transaction_number,
            outbox,
        ))
    }

    pub async fn release_source_address_lock(
        &self,
        command: &ReleaseSourceAddressLock,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        let policy = self.policies.for_blockchain(&command.blockchain_type);
        policy
            .release(LockRequest {
                transaction_id: command.transaction_id,
                blockchain_type: &command.blockchain_type,
                from_address: &command.from_address,
                outputs: &command.outputs,
            })
            .await
            .map_err(HandlingError::transient)?;

        outbox.push(SourceAddressLockReleased {
            operation_id: command.operation_id,
            transaction_id: command.transaction_id,
            locking: policy.mode(),
            abort_workflow: command.abort_workflow,
            occurred_at: Utc::now(),
        });
        Ok(CommandHandlingResult::Handled)
    }

    pub async fn start_waiting_for_ending(
        &self,
        command: &StartWaitingForTransactionEnding,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        outbox.push(TransactionEndingWaitingStarted {
            operation_id: command.operation_id,
            transaction_id: command.transaction_id,
            occurred_at: Utc::now(),
        });
        Ok(CommandHandlingResult::Handled)
    }

    pub async fn wait_for_ending(
        &self,
        command: &WaitForTransactionEnding,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        let ending = self
            .adapter
            .query_broadcasted(
                command.transaction_id,
                &command.blockchain_type,
                &command.blockchain_asset_id,
            )
            .await
            .map_err(HandlingError::transient)?;

        let failure = match ending {
            TransactionEnding::InProgress => {
                debug!(transaction_id = %command.transaction_id, "transaction is not settled yet");
                return Ok(CommandHandlingResult::retry_after(
                    self.retry.waiting_for_ending_delay(),
                ));
            }
            TransactionEnding::Completed(completed) => {
                outbox.push(TransactionExecutionCompleted {
                    operation_id: command.operation_id,
                    transaction_id: command.transaction_id,
                    transaction_number: command.transaction_number,
                    outputs: completed.outputs,
                    fee: completed.fee,
                    block: completed.block,
                    hash: completed.hash,
                    occurred_at: Utc::now(),
                });
                return Ok(CommandHandlingResult::Handled);
            }
            TransactionEnding::Failed {
                code: TransactionExecutionErrorCode::RebuildingIsRequired,
                message,
            } => Failure::RepeatRequested(message),
            TransactionEnding::Failed { code, message } => Failure::Failed(code, message),
        };

        Ok(self.report(
            failure,
            command.operation_id,
            command.transaction_id,
            command.transaction_number,
            outbox,
        ))
    }

    pub async fn clear_broadcasted(
        &self,
        command: &ClearBroadcastedTransaction,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        self.adapter
            .forget_broadcasted(command.transaction_id, &command.blockchain_type)
            .await
            .map_err(HandlingError::transient)?;

        outbox.push(BroadcastedTransactionCleared {
            operation_id: command.operation_id,
            transaction_id: command.transaction_id,
            occurred_at: Utc::now(),
        });
        Ok(CommandHandlingResult::Handled)
    }

    fn report(
        &self,
        failure: Failure,
        operation_id: OperationId,
        transaction_id: TransactionId,
        transaction_number: u32,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> CommandHandlingResult {
        match failure {
            Failure::NotEnoughBalance => {
                info!(%transaction_id, "not enough balance on the source address");
                return CommandHandlingResult::retry_after(self.retry.not_enough_balance_delay());
            }
            Failure::Failed(error_code, error) => {
                info!(%transaction_id, ?error_code, %error, "transaction execution failed");
                outbox.push(TransactionExecutionFailed {
                    operation_id,
                    transaction_id,
                    transaction_number,
                    error_code,
                    error,
                    occurred_at: Utc::now(),
                });
            }
            Failure::RepeatRequested(error) => {
                info!(%transaction_id, %error, "transaction has to be rebuilt");
                outbox.push(TransactionExecutionRepeatRequested {
                    operation_id,
                    transaction_id,
                    transaction_number,
                    error_code: TransactionExecutionErrorCode::RebuildingIsRequired,
                    error,
                    occurred_at: Utc::now(),
                });
            }
        }
        CommandHandlingResult::Handled
    }
}
