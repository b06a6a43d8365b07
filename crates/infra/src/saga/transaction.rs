use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use txexec_events::{HandlingError, Outbox, Saga};
use txexec_execution::commands::{
    BroadcastTransaction, BuildTransaction, ClearBroadcastedTransaction, LockSourceAddress,
    ReleaseSourceAddressLock, SignTransaction, StartWaitingForTransactionEnding,
    WaitForTransactionEnding,
};
use txexec_execution::events::{TransactionBuildingRejected, TransactionExecutionStarted};
use txexec_execution::{
    ExecutorCommand, ExecutorEvent, TransactionExecution, TransactionExecutionState as S,
};

use crate::locking::LockingPolicies;
use crate::repository::AggregateRepository;

/// Drives one transaction attempt from lock to clear.
///
/// The saga is the same for both locking modes; the locking policy of the
/// attempt's blockchain provides the state table.
pub struct TransactionExecutionSaga {
    policies: Arc<LockingPolicies>,
    transactions: Arc<dyn AggregateRepository<TransactionExecution>>,
}

impl TransactionExecutionSaga {
    pub fn new(
        policies: Arc<LockingPolicies>,
        transactions: Arc<dyn AggregateRepository<TransactionExecution>>,
    ) -> Self {
        Self {
            policies,
            transactions,
        }
    }

    async fn on_started(
        &self,
        event: &TransactionExecutionStarted,
        outbox: &mut Outbox<ExecutorCommand>,
    ) -> Result<(), HandlingError> {
        let transaction = self
            .transactions
            .get_or_add(TransactionExecution::start(event))
            .await
            .map_err(HandlingError::transient)?;

        if transaction.state() == S::Started {
            outbox.push(LockSourceAddress {
                operation_id: transaction.operation_id(),
                transaction_id: transaction.transaction_id(),
                blockchain_type: transaction.blockchain_type().clone(),
                from_address: transaction.from_address().clone(),
                outputs: transaction.outputs().to_vec(),
            });
        }
        Ok(())
    }

    async fn on_building_rejected(
        &self,
        event: &TransactionBuildingRejected,
        outbox: &mut Outbox<ExecutorCommand>,
    ) -> Result<(), HandlingError> {
        let transaction = self
            .transactions
            .get(&event.transaction_id)
            .await
            .map_err(HandlingError::transient)?;

        info!(
            transaction_id = %event.transaction_id,
            state = ?transaction.state(),
            "releasing the lock of a superseded transaction"
        );
        outbox.push(release(&transaction, true));
        Ok(())
    }

    async fn on_progress(
        &self,
        event: &ExecutorEvent,
        outbox: &mut Outbox<ExecutorCommand>,
    ) -> Result<(), HandlingError> {
        let Some(transaction_id) = event.transaction_id() else {
            return Ok(());
        };

        let mut transaction = self
            .transactions
            .get(&transaction_id)
            .await
            .map_err(HandlingError::transient)?;

        let policy = self.policies.for_blockchain(transaction.blockchain_type());
        let result = policy.transitions().switch(&mut transaction, event);
        if !super::switched(self.saga_type(), event, result)? {
            return Ok(());
        }

        if let Err(err) = transaction.check_invariants() {
            error!(
                %transaction_id,
                state = ?transaction.state(),
                error = %err,
                "transaction state is inconsistent"
            );
            return Err(HandlingError::transient(err));
        }

        if let Some(command) = next_command(&transaction) {
            outbox.push(command);
        }

        self.transactions
            .save(&mut transaction)
            .await
            .map_err(HandlingError::transient)
    }
}

/// Command for the step following the state the attempt just entered.
fn next_command(transaction: &TransactionExecution) -> Option<ExecutorCommand> {
    let operation_id = transaction.operation_id();
    let transaction_id = transaction.transaction_id();

    let command: ExecutorCommand = match transaction.state() {
        S::SourceAddressLocked | S::SourceAndTargetAddressesLocked => BuildTransaction {
            operation_id,
            transaction_id,
            transaction_number: transaction.transaction_number(),
            blockchain_type: transaction.blockchain_type().clone(),
            blockchain_asset_id: transaction.blockchain_asset_id().clone(),
            from_address: transaction.from_address().clone(),
            outputs: transaction.outputs().to_vec(),
            include_fee: transaction.include_fee(),
        }
        .into(),
        S::Built => SignTransaction {
            operation_id,
            transaction_id,
            blockchain_type: transaction.blockchain_type().clone(),
            signer_address: transaction.from_address().clone(),
            transaction_context: transaction.transaction_context()?.to_string(),
        }
        .into(),
        S::Signed => BroadcastTransaction {
            operation_id,
            transaction_id,
            transaction_number: transaction.transaction_number(),
            blockchain_type: transaction.blockchain_type().clone(),
            signed_transaction: transaction.signed_transaction()?.to_string(),
        }
        .into(),
        S::Broadcasted | S::BuildingFailed | S::BroadcastingFailed => {
            release(transaction, false).into()
        }
        S::SourceAddressReleased | S::SourceAndTargetAddressesReleased => {
            if transaction.has_failed() {
                clear(transaction).into()
            } else {
                StartWaitingForTransactionEnding {
                    operation_id,
                    transaction_id,
                }
                .into()
            }
        }
        S::WaitingForEnding => WaitForTransactionEnding {
            operation_id,
            transaction_id,
            transaction_number: transaction.transaction_number(),
            blockchain_type: transaction.blockchain_type().clone(),
            blockchain_asset_id: transaction.blockchain_asset_id().clone(),
        }
        .into(),
        S::Completed | S::WaitingForEndingFailed => clear(transaction).into(),
        S::Started | S::Cleared => return None,
    };

    Some(command)
}

fn release(transaction: &TransactionExecution, abort_workflow: bool) -> ReleaseSourceAddressLock {
    ReleaseSourceAddressLock {
        operation_id: transaction.operation_id(),
        transaction_id: transaction.transaction_id(),
        blockchain_type: transaction.blockchain_type().clone(),
        from_address: transaction.from_address().clone(),
        outputs: transaction.outputs().to_vec(),
        abort_workflow,
    }
}

fn clear(transaction: &TransactionExecution) -> ClearBroadcastedTransaction {
    ClearBroadcastedTransaction {
        operation_id: transaction.operation_id(),
        transaction_id: transaction.transaction_id(),
        blockchain_type: transaction.blockchain_type().clone(),
    }
}

#[async_trait]
impl Saga for TransactionExecutionSaga {
    type Ev = ExecutorEvent;
    type Cmd = ExecutorCommand;

    fn saga_type(&self) -> &'static str {
        "saga.transaction_execution"
    }

    async fn handle(
        &self,
        event: &ExecutorEvent,
        outbox: &mut Outbox<ExecutorCommand>,
    ) -> Result<(), HandlingError> {
        match event {
            ExecutorEvent::TransactionExecutionStarted(e) => self.on_started(e, outbox).await,
            ExecutorEvent::TransactionBuildingRejected(e) => {
                self.on_building_rejected(e, outbox).await
            }
            ExecutorEvent::SourceAddressLockReleased(e) if e.abort_workflow => {
                debug!(
                    transaction_id = %e.transaction_id,
                    "superseded transaction released its lock"
                );
                Ok(())
            }
            ExecutorEvent::SourceAddressLocked(_)
            | ExecutorEvent::TransactionBuilt(_)
            | ExecutorEvent::TransactionSigned(_)
            | ExecutorEvent::TransactionBroadcasted(_)
            | ExecutorEvent::SourceAddressLockReleased(_)
            | ExecutorEvent::TransactionEndingWaitingStarted(_)
            | ExecutorEvent::TransactionExecutionCompleted(_)
            | ExecutorEvent::TransactionExecutionFailed(_)
            | ExecutorEvent::TransactionExecutionRepeatRequested(_)
            | ExecutorEvent::BroadcastedTransactionCleared(_) => {
                self.on_progress(event, outbox).await
            }
            ExecutorEvent::OperationExecutionStarted(_)
            | ExecutorEvent::ActiveTransactionIdGenerated(_)
            | ExecutorEvent::OperationExecutionCompleted(_)
            | ExecutorEvent::OneToManyOperationExecutionCompleted(_)
            | ExecutorEvent::OperationExecutionFailed(_) => Ok(()),
        }
    }
}
