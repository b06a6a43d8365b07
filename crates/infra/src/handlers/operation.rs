use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};

use txexec_core::OperationId;
use txexec_events::{CommandHandlingResult, HandlingError, Outbox};
use txexec_execution::commands::{
    GenerateActiveTransactionId, NotifyOperationExecutionCompleted,
    NotifyOperationExecutionFailed, StartOneToManyOperationExecution, StartOperationExecution,
    StartTransactionExecution,
};
use txexec_execution::events::{
    ActiveTransactionIdGenerated, OneToManyOperationExecutionCompleted,
    OperationExecutionCompleted, OperationExecutionFailed, OperationExecutionStarted,
    TransactionExecutionStarted,
};
use txexec_execution::{
    Address, AssetId, EndpointsConfiguration, ExecutorEvent, OperationExecutionErrorCode,
    TransactionOutput, validate_outputs,
};

use crate::active_transactions::ActiveTransactionIdStore;
use crate::adapters::{AssetLookup, AssetLookupError};

/// Handles caller requests and the operation-level workflow steps.
pub struct OperationCommandHandler {
    assets: Arc<dyn AssetLookup>,
    active_transactions: Arc<dyn ActiveTransactionIdStore>,
}

impl OperationCommandHandler {
    pub fn new(
        assets: Arc<dyn AssetLookup>,
        active_transactions: Arc<dyn ActiveTransactionIdStore>,
    ) -> Self {
        Self {
            assets,
            active_transactions,
        }
    }

    pub async fn start(
        &self,
        command: &StartOperationExecution,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        let outputs = vec![TransactionOutput {
            address: command.to_address.clone(),
            amount: command.amount,
        }];

        self.start_operation(
            command.operation_id,
            &command.from_address,
            outputs,
            &command.asset_id,
            command.include_fee,
            EndpointsConfiguration::SingleDestination,
            outbox,
        )
        .await
    }

    pub async fn start_one_to_many(
        &self,
        command: &StartOneToManyOperationExecution,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        self.start_operation(
            command.operation_id,
            &command.from_address,
            command.outputs.clone(),
            &command.asset_id,
            command.include_fee,
            EndpointsConfiguration::OneToMany,
            outbox,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn start_operation(
        &self,
        operation_id: OperationId,
        from_address: &Address,
        outputs: Vec<TransactionOutput>,
        asset_id: &AssetId,
        include_fee: bool,
        endpoints_configuration: EndpointsConfiguration,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        if let Err(err) = validate_outputs(&outputs) {
            error!(%operation_id, error = %err, "operation rejected");
            outbox.push(rejected(
                operation_id,
                OperationExecutionErrorCode::InvalidRequest,
                err.to_string(),
            ));
            return Ok(CommandHandlingResult::Handled);
        }

        let asset = match self.assets.resolve(asset_id).await {
            Ok(asset) => asset,
            Err(err @ AssetLookupError::UnknownAsset(_)) => {
                error!(%operation_id, %asset_id, "operation rejected: unknown asset");
                outbox.push(rejected(
                    operation_id,
                    OperationExecutionErrorCode::UnknownAsset,
                    err.to_string(),
                ));
                return Ok(CommandHandlingResult::Handled);
            }
            Err(err) => return Err(HandlingError::transient(err)),
        };

        outbox.push(OperationExecutionStarted {
            operation_id,
            from_address: from_address.clone(),
            outputs,
            asset_id: asset_id.clone(),
            blockchain_type: asset.blockchain_type,
            blockchain_asset_id: asset.blockchain_asset_id,
            include_fee,
            endpoints_configuration,
            occurred_at: Utc::now(),
        });
        Ok(CommandHandlingResult::Handled)
    }

    pub async fn generate_active_transaction_id(
        &self,
        command: &GenerateActiveTransactionId,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        let transaction_id = self
            .active_transactions
            .get_or_create(command.operation_id, command.transaction_number)
            .await
            .map_err(HandlingError::transient)?;

        outbox.push(ActiveTransactionIdGenerated {
            operation_id: command.operation_id,
            transaction_id,
            transaction_number: command.transaction_number,
            occurred_at: Utc::now(),
        });
        Ok(CommandHandlingResult::Handled)
    }

    pub async fn start_transaction(
        &self,
        command: &StartTransactionExecution,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        outbox.push(TransactionExecutionStarted {
            operation_id: command.operation_id,
            transaction_id: command.transaction_id,
            transaction_number: command.transaction_number,
            from_address: command.from_address.clone(),
            outputs: command.outputs.clone(),
            asset_id: command.asset_id.clone(),
            blockchain_type: command.blockchain_type.clone(),
            blockchain_asset_id: command.blockchain_asset_id.clone(),
            include_fee: command.include_fee,
            occurred_at: Utc::now(),
        });
        Ok(CommandHandlingResult::Handled)
    }

    pub async fn notify_completed(
        &self,
        command: &NotifyOperationExecutionCompleted,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        match (command.endpoints_configuration, command.outputs.as_slice()) {
            (EndpointsConfiguration::SingleDestination, [output]) => {
                outbox.push(OperationExecutionCompleted {
                    operation_id: command.operation_id,
                    from_address: command.from_address.clone(),
                    to_address: output.address.clone(),
                    asset_id: command.asset_id.clone(),
                    amount: output.amount,
                    fee: command.fee,
                    block: command.block,
                    hash: command.hash.clone(),
                    occurred_at: Utc::now(),
                });
            }
            (configuration, outputs) => {
                if configuration == EndpointsConfiguration::SingleDestination {
                    warn!(
                        operation_id = %command.operation_id,
                        outputs = outputs.len(),
                        "single destination operation completed with several outputs"
                    );
                }
                outbox.push(OneToManyOperationExecutionCompleted {
                    operation_id: command.operation_id,
                    from_address: command.from_address.clone(),
                    outputs: outputs.to_vec(),
                    asset_id: command.asset_id.clone(),
                    fee: command.fee,
                    block: command.block,
                    hash: command.hash.clone(),
                    occurred_at: Utc::now(),
                });
            }
        }
        Ok(CommandHandlingResult::Handled)
    }

    pub async fn notify_failed(
        &self,
        command: &NotifyOperationExecutionFailed,
        outbox: &mut Outbox<ExecutorEvent>,
    ) -> Result<CommandHandlingResult, HandlingError> {
        outbox.push(OperationExecutionFailed {
            operation_id: command.operation_id,
            error_code: command.error_code,
            error: command.error.clone(),
            occurred_at: Utc::now(),
        });
        Ok(CommandHandlingResult::Handled)
    }
}

/// Caller notification for an operation refused before it started.
fn rejected(
    operation_id: OperationId,
    error_code: OperationExecutionErrorCode,
    error: String,
) -> OperationExecutionFailed {
    OperationExecutionFailed {
        operation_id,
        error_code,
        error,
        occurred_at: Utc::now(),
    }
}
