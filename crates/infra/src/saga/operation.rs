use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use txexec_core::{AggregateRoot, SwitcherBuildError};
use txexec_events::{HandlingError, Outbox, Saga};
use txexec_execution::commands::{
    GenerateActiveTransactionId, NotifyOperationExecutionCompleted,
    NotifyOperationExecutionFailed, StartTransactionExecution,
};
use txexec_execution::events::OperationExecutionStarted;
use txexec_execution::{
    ExecutorCommand, ExecutorEvent, OperationExecution, OperationExecutionErrorCode,
    OperationExecutionState as S, OperationSwitcher, operation_transitions,
};

use crate::repository::{AggregateRepository, RepositoryError};

/// Drives an operation through its transaction attempts.
pub struct OperationExecutionSaga {
    transitions: OperationSwitcher,
    operations: Arc<dyn AggregateRepository<OperationExecution>>,
}

impl OperationExecutionSaga {
    pub fn new(
        operations: Arc<dyn AggregateRepository<OperationExecution>>,
        max_transaction_attempts: Option<u32>,
    ) -> Result<Self, SwitcherBuildError> {
        Ok(Self {
            transitions: operation_transitions(max_transaction_attempts)?,
            operations,
        })
    }

    async fn on_started(
        &self,
        event: &OperationExecutionStarted,
        outbox: &mut Outbox<ExecutorCommand>,
    ) -> Result<(), HandlingError> {
        let operation = self
            .operations
            .get_or_add(OperationExecution::start(event))
            .await
            .map_err(HandlingError::transient)?;

        if operation.state() == S::Started {
            outbox.push(GenerateActiveTransactionId {
                operation_id: operation.operation_id(),
                transaction_number: operation.active_transaction_number() + 1,
            });
        }
        Ok(())
    }

    async fn on_progress(
        &self,
        event: &ExecutorEvent,
        outbox: &mut Outbox<ExecutorCommand>,
    ) -> Result<(), HandlingError> {
        let operation_id = event.operation_id();
        let found = self
            .operations
            .try_get(&operation_id)
            .await
            .map_err(HandlingError::transient)?;
        let Some(mut operation) = found else {
            if event.is_caller_facing() {
                // Rejected before it started: nothing was stored.
                debug!(%operation_id, "notification of an operation that never started");
                return Ok(());
            }
            return Err(HandlingError::transient(RepositoryError::NotFound {
                aggregate_type: OperationExecution::AGGREGATE_TYPE,
                id: operation_id.to_string(),
            }));
        };

        if is_stale(&operation, event) {
            debug!(
                %operation_id,
                transaction_id = ?event.transaction_id(),
                active_transaction_id = ?operation.active_transaction_id(),
                "event of a previous transaction dropped"
            );
            return Ok(());
        }

        let result = self.transitions.switch(&mut operation, event);
        if !super::switched(self.saga_type(), event, result)? {
            return Ok(());
        }

        if let Some(command) = next_command(&operation) {
            outbox.push(command);
        }

        self.operations
            .save(&mut operation)
            .await
            .map_err(HandlingError::transient)
    }
}

/// Events of an attempt that is no longer the active one.
///
/// A generated id is stale when a later attempt is active, or when the
/// attempt with the same number was already cleared.
fn is_stale(operation: &OperationExecution, event: &ExecutorEvent) -> bool {
    match event {
        ExecutorEvent::ActiveTransactionIdGenerated(e) => {
            let active = operation.active_transaction_number();
            let cleared = operation.state() == S::ActiveTransactionCleared;
            e.transaction_number < active || (e.transaction_number == active && cleared)
        }
        ExecutorEvent::TransactionExecutionStarted(_)
        | ExecutorEvent::TransactionExecutionCompleted(_)
        | ExecutorEvent::TransactionExecutionFailed(_)
        | ExecutorEvent::TransactionExecutionRepeatRequested(_) => event
            .transaction_id()
            .is_some_and(|id| !operation.is_active_transaction(id)),
        _ => false,
    }
}

fn next_command(operation: &OperationExecution) -> Option<ExecutorCommand> {
    let operation_id = operation.operation_id();

    let command: ExecutorCommand = match operation.state() {
        S::ActiveTransactionIdGenerated => StartTransactionExecution {
            operation_id,
            transaction_id: operation.active_transaction_id()?,
            transaction_number: operation.active_transaction_number(),
            from_address: operation.from_address().clone(),
            outputs: operation.outputs().to_vec(),
            asset_id: operation.asset_id().clone(),
            blockchain_type: operation.blockchain_type().clone(),
            blockchain_asset_id: operation.blockchain_asset_id().clone(),
            include_fee: operation.include_fee(),
        }
        .into(),
        S::ActiveTransactionCleared => {
            info!(
                %operation_id,
                transaction_number = operation.active_transaction_number(),
                "transaction has to be rebuilt, starting the next attempt"
            );
            GenerateActiveTransactionId {
                operation_id,
                transaction_number: operation.active_transaction_number() + 1,
            }
            .into()
        }
        S::Completed => {
            let completion = operation.completion()?;
            NotifyOperationExecutionCompleted {
                operation_id,
                endpoints_configuration: operation.endpoints_configuration(),
                from_address: operation.from_address().clone(),
                outputs: completion.outputs.clone(),
                asset_id: operation.asset_id().clone(),
                fee: completion.fee,
                block: completion.block,
                hash: completion.hash.clone(),
            }
            .into()
        }
        S::Failed => {
            let (error_code, error) = operation
                .error()
                .map(|e| (e.code, e.message.clone()))
                .unwrap_or((OperationExecutionErrorCode::Unknown, String::new()));
            NotifyOperationExecutionFailed {
                operation_id,
                error_code,
                error,
            }
            .into()
        }
        S::Started | S::TransactionExecutionInProgress | S::NotifiedAboutEnding => return None,
    };

    Some(command)
}

#[async_trait]
impl Saga for OperationExecutionSaga {
    type Ev = ExecutorEvent;
    type Cmd = ExecutorCommand;

    fn saga_type(&self) -> &'static str {
        "saga.operation_execution"
    }

    async fn handle(
        &self,
        event: &ExecutorEvent,
        outbox: &mut Outbox<ExecutorCommand>,
    ) -> Result<(), HandlingError> {
        match event {
            ExecutorEvent::OperationExecutionStarted(e) => self.on_started(e, outbox).await,
            ExecutorEvent::ActiveTransactionIdGenerated(_)
            | ExecutorEvent::TransactionExecutionStarted(_)
            | ExecutorEvent::TransactionExecutionCompleted(_)
            | ExecutorEvent::TransactionExecutionFailed(_)
            | ExecutorEvent::TransactionExecutionRepeatRequested(_)
            | ExecutorEvent::OperationExecutionCompleted(_)
            | ExecutorEvent::OneToManyOperationExecutionCompleted(_)
            | ExecutorEvent::OperationExecutionFailed(_) => self.on_progress(event, outbox).await,
            _ => Ok(()),
        }
    }
}
