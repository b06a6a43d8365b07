//! Commands accepted by the executor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use txexec_core::{OperationId, TransactionId};
use txexec_events::Command;

use crate::common::{
    Address, AssetId, BlockchainAssetId, BlockchainType, EndpointsConfiguration,
    TransactionOutput,
};
use crate::errors::OperationExecutionErrorCode;

/// Command: StartOperationExecution (caller, single destination).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOperationExecution {
    pub operation_id: OperationId,
    pub from_address: Address,
    pub to_address: Address,
    pub asset_id: AssetId,
    pub amount: Decimal,
    pub include_fee: bool,
}

/// Command: StartOneToManyOperationExecution (caller, fan-out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOneToManyOperationExecution {
    pub operation_id: OperationId,
    pub from_address: Address,
    pub outputs: Vec<TransactionOutput>,
    pub asset_id: AssetId,
    pub include_fee: bool,
}

/// Command: GenerateActiveTransactionId.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateActiveTransactionId {
    pub operation_id: OperationId,
    /// Number of the attempt the id is generated for.
    pub transaction_number: u32,
}

/// Command: StartTransactionExecution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartTransactionExecution {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub transaction_number: u32,
    pub from_address: Address,
    pub outputs: Vec<TransactionOutput>,
    pub asset_id: AssetId,
    pub blockchain_type: BlockchainType,
    pub blockchain_asset_id: BlockchainAssetId,
    pub include_fee: bool,
}

/// Command: NotifyOperationExecutionCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyOperationExecutionCompleted {
    pub operation_id: OperationId,
    pub endpoints_configuration: EndpointsConfiguration,
    pub from_address: Address,
    pub outputs: Vec<TransactionOutput>,
    pub asset_id: AssetId,
    pub fee: Decimal,
    pub block: u64,
    pub hash: String,
}

/// Command: NotifyOperationExecutionFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyOperationExecutionFailed {
    pub operation_id: OperationId,
    pub error_code: OperationExecutionErrorCode,
    pub error: String,
}

/// Command: LockSourceAddress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSourceAddress {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub blockchain_type: BlockchainType,
    pub from_address: Address,
    pub outputs: Vec<TransactionOutput>,
}

/// Command: BuildTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTransaction {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub transaction_number: u32,
    pub blockchain_type: BlockchainType,
    pub blockchain_asset_id: BlockchainAssetId,
    pub from_address: Address,
    pub outputs: Vec<TransactionOutput>,
    pub include_fee: bool,
}

/// Command: SignTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignTransaction {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub blockchain_type: BlockchainType,
    pub signer_address: Address,
    pub transaction_context: String,
}

/// Command: BroadcastTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastTransaction {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub transaction_number: u32,
    pub blockchain_type: BlockchainType,
    pub signed_transaction: String,
}

/// Command: ReleaseSourceAddressLock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSourceAddressLock {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub blockchain_type: BlockchainType,
    pub from_address: Address,
    pub outputs: Vec<TransactionOutput>,
    /// Set when reclaiming the lock of a superseded attempt.
    pub abort_workflow: bool,
}

/// Command: StartWaitingForTransactionEnding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWaitingForTransactionEnding {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
}

/// Command: WaitForTransactionEnding (redelivered until the chain settles).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitForTransactionEnding {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub transaction_number: u32,
    pub blockchain_type: BlockchainType,
    pub blockchain_asset_id: BlockchainAssetId,
}

/// Command: ClearBroadcastedTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearBroadcastedTransaction {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub blockchain_type: BlockchainType,
}

macro_rules! executor_commands {
    ($($variant:ident => $command_type:literal),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum ExecutorCommand {
            $($variant($variant),)*
        }

        impl ExecutorCommand {
            pub fn operation_id(&self) -> OperationId {
                match self {
                    $(ExecutorCommand::$variant(c) => c.operation_id,)*
                }
            }
        }

        impl Command for ExecutorCommand {
            fn command_type(&self) -> &'static str {
                match self {
                    $(ExecutorCommand::$variant(c) => c.command_type(),)*
                }
            }

            fn correlation_id(&self) -> Uuid {
                *self.operation_id().as_uuid()
            }
        }

        $(
            impl Command for $variant {
                fn command_type(&self) -> &'static str {
                    $command_type
                }

                fn correlation_id(&self) -> Uuid {
                    *self.operation_id.as_uuid()
                }
            }

            impl From<$variant> for ExecutorCommand {
                fn from(value: $variant) -> Self {
                    ExecutorCommand::$variant(value)
                }
            }
        )*
    };
}

executor_commands! {
    StartOperationExecution => "operation.start",
    StartOneToManyOperationExecution => "operation.start_one_to_many",
    GenerateActiveTransactionId => "operation.generate_active_transaction_id",
    StartTransactionExecution => "operation.start_transaction",
    NotifyOperationExecutionCompleted => "operation.notify_completed",
    NotifyOperationExecutionFailed => "operation.notify_failed",
    LockSourceAddress => "transaction.lock_source_address",
    BuildTransaction => "transaction.build",
    SignTransaction => "transaction.sign",
    BroadcastTransaction => "transaction.broadcast",
    ReleaseSourceAddressLock => "transaction.release_source_address_lock",
    StartWaitingForTransactionEnding => "transaction.start_waiting_for_ending",
    WaitForTransactionEnding => "transaction.wait_for_ending",
    ClearBroadcastedTransaction => "transaction.clear",
}
