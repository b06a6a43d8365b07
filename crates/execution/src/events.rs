//! Events exchanged by handlers, sagas and the caller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use txexec_core::{ClosedSet, EventVariant, OperationId, SwitchEvent, TransactionId};
use txexec_events::Event;

use crate::common::{
    Address, AssetId, BlockchainAssetId, BlockchainType, EndpointsConfiguration, LockingMode,
    TransactionOutput,
};
use crate::errors::{OperationExecutionErrorCode, TransactionExecutionErrorCode};

/// Event: OperationExecutionStarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationExecutionStarted {
    pub operation_id: OperationId,
    pub from_address: Address,
    pub outputs: Vec<TransactionOutput>,
    pub asset_id: AssetId,
    pub blockchain_type: BlockchainType,
    pub blockchain_asset_id: BlockchainAssetId,
    pub include_fee: bool,
    pub endpoints_configuration: EndpointsConfiguration,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ActiveTransactionIdGenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTransactionIdGenerated {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub transaction_number: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionExecutionStarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionExecutionStarted {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub transaction_number: u32,
    pub from_address: Address,
    pub outputs: Vec<TransactionOutput>,
    pub asset_id: AssetId,
    pub blockchain_type: BlockchainType,
    pub blockchain_asset_id: BlockchainAssetId,
    pub include_fee: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SourceAddressLocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAddressLocked {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub locking: LockingMode,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionBuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBuilt {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub transaction_context: String,
    pub source_address_context: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionSigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSigned {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub signed_transaction: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionBroadcasted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBroadcasted {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SourceAddressLockReleased.
///
/// `abort_workflow` is set when the release reclaimed the lock of a
/// superseded attempt; no further step follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAddressLockReleased {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub locking: LockingMode,
    pub abort_workflow: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionEndingWaitingStarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEndingWaitingStarted {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionExecutionCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionExecutionCompleted {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub transaction_number: u32,
    pub outputs: Vec<TransactionOutput>,
    pub fee: Decimal,
    pub block: u64,
    pub hash: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionExecutionFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionExecutionFailed {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub transaction_number: u32,
    pub error_code: TransactionExecutionErrorCode,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionExecutionRepeatRequested (the attempt must be rebuilt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionExecutionRepeatRequested {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub transaction_number: u32,
    pub error_code: TransactionExecutionErrorCode,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionBuildingRejected.
///
/// The attempt was superseded while it was retrying its build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBuildingRejected {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BroadcastedTransactionCleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastedTransactionCleared {
    pub operation_id: OperationId,
    pub transaction_id: TransactionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OperationExecutionCompleted (single destination, caller-facing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationExecutionCompleted {
    pub operation_id: OperationId,
    pub from_address: Address,
    pub to_address: Address,
    pub asset_id: AssetId,
    pub amount: Decimal,
    pub fee: Decimal,
    pub block: u64,
    pub hash: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OneToManyOperationExecutionCompleted (fan-out, caller-facing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneToManyOperationExecutionCompleted {
    pub operation_id: OperationId,
    pub from_address: Address,
    pub outputs: Vec<TransactionOutput>,
    pub asset_id: AssetId,
    pub fee: Decimal,
    pub block: u64,
    pub hash: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OperationExecutionFailed (caller-facing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationExecutionFailed {
    pub operation_id: OperationId,
    pub error_code: OperationExecutionErrorCode,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}

macro_rules! executor_events {
    ($($variant:ident => $event_type:literal),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum ExecutorEvent {
            $($variant($variant),)*
        }

        /// Payload-free discriminant of [`ExecutorEvent`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum ExecutorEventKind {
            $($variant,)*
        }

        impl ClosedSet for ExecutorEventKind {
            fn members() -> &'static [Self] {
                &[$(ExecutorEventKind::$variant,)*]
            }
        }

        impl SwitchEvent for ExecutorEvent {
            type Kind = ExecutorEventKind;

            fn kind(&self) -> ExecutorEventKind {
                match self {
                    $(ExecutorEvent::$variant(_) => ExecutorEventKind::$variant,)*
                }
            }
        }

        impl ExecutorEvent {
            pub fn operation_id(&self) -> OperationId {
                match self {
                    $(ExecutorEvent::$variant(e) => e.operation_id,)*
                }
            }
        }

        impl Event for ExecutorEvent {
            fn event_type(&self) -> &'static str {
                match self {
                    $(ExecutorEvent::$variant(_) => $event_type,)*
                }
            }

            fn occurred_at(&self) -> DateTime<Utc> {
                match self {
                    $(ExecutorEvent::$variant(e) => e.occurred_at,)*
                }
            }

            fn correlation_id(&self) -> Uuid {
                *self.operation_id().as_uuid()
            }
        }

        $(
            impl EventVariant<ExecutorEvent> for $variant {
                const KIND: ExecutorEventKind = ExecutorEventKind::$variant;

                fn extract(event: &ExecutorEvent) -> Option<&Self> {
                    match event {
                        ExecutorEvent::$variant(e) => Some(e),
                        _ => None,
                    }
                }
            }

            impl From<$variant> for ExecutorEvent {
                fn from(value: $variant) -> Self {
                    ExecutorEvent::$variant(value)
                }
            }
        )*
    };
}

executor_events! {
    OperationExecutionStarted => "operation.started",
    ActiveTransactionIdGenerated => "operation.active_transaction_id_generated",
    TransactionExecutionStarted => "transaction.started",
    SourceAddressLocked => "transaction.source_address_locked",
    TransactionBuilt => "transaction.built",
    TransactionSigned => "transaction.signed",
    TransactionBroadcasted => "transaction.broadcasted",
    SourceAddressLockReleased => "transaction.source_address_lock_released",
    TransactionEndingWaitingStarted => "transaction.ending_waiting_started",
    TransactionExecutionCompleted => "transaction.completed",
    TransactionExecutionFailed => "transaction.failed",
    TransactionExecutionRepeatRequested => "transaction.repeat_requested",
    TransactionBuildingRejected => "transaction.building_rejected",
    BroadcastedTransactionCleared => "transaction.cleared",
    OperationExecutionCompleted => "operation.completed",
    OneToManyOperationExecutionCompleted => "operation.one_to_many_completed",
    OperationExecutionFailed => "operation.failed",
}

impl ExecutorEvent {
    /// Transaction the event belongs to, for transaction-level events.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            ExecutorEvent::ActiveTransactionIdGenerated(e) => Some(e.transaction_id),
            ExecutorEvent::TransactionExecutionStarted(e) => Some(e.transaction_id),
            ExecutorEvent::SourceAddressLocked(e) => Some(e.transaction_id),
            ExecutorEvent::TransactionBuilt(e) => Some(e.transaction_id),
            ExecutorEvent::TransactionSigned(e) => Some(e.transaction_id),
            ExecutorEvent::TransactionBroadcasted(e) => Some(e.transaction_id),
            ExecutorEvent::SourceAddressLockReleased(e) => Some(e.transaction_id),
            ExecutorEvent::TransactionEndingWaitingStarted(e) => Some(e.transaction_id),
            ExecutorEvent::TransactionExecutionCompleted(e) => Some(e.transaction_id),
            ExecutorEvent::TransactionExecutionFailed(e) => Some(e.transaction_id),
            ExecutorEvent::TransactionExecutionRepeatRequested(e) => Some(e.transaction_id),
            ExecutorEvent::TransactionBuildingRejected(e) => Some(e.transaction_id),
            ExecutorEvent::BroadcastedTransactionCleared(e) => Some(e.transaction_id),
            ExecutorEvent::OperationExecutionStarted(_)
            | ExecutorEvent::OperationExecutionCompleted(_)
            | ExecutorEvent::OneToManyOperationExecutionCompleted(_)
            | ExecutorEvent::OperationExecutionFailed(_) => None,
        }
    }

    /// Notifications addressed to the caller of the operation.
    pub fn is_caller_facing(&self) -> bool {
        matches!(
            self,
            ExecutorEvent::OperationExecutionCompleted(_)
                | ExecutorEvent::OneToManyOperationExecutionCompleted(_)
                | ExecutorEvent::OperationExecutionFailed(_)
        )
    }
}
