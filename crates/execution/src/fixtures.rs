//! Deterministic messages for unit tests.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use txexec_core::{OperationId, TransactionId};

use crate::common::{
    Address, AssetId, BlockchainAssetId, BlockchainType, EndpointsConfiguration, LockingMode,
    TransactionOutput,
};
use crate::errors::{OperationExecutionErrorCode, TransactionExecutionErrorCode};
use crate::events::*;

pub(crate) fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
}

pub(crate) fn operation_id() -> OperationId {
    OperationId::from_uuid(Uuid::from_u128(0x1111))
}

pub(crate) fn transaction_id(number: u32) -> TransactionId {
    TransactionId::from_uuid(Uuid::from_u128(0x2000 + number as u128))
}

pub(crate) fn outputs() -> Vec<TransactionOutput> {
    vec![TransactionOutput::new("dest-1", Decimal::new(125, 2))]
}

pub(crate) fn operation_started() -> OperationExecutionStarted {
    OperationExecutionStarted {
        operation_id: operation_id(),
        from_address: Address::new("source"),
        outputs: outputs(),
        asset_id: AssetId::new("ETH"),
        blockchain_type: BlockchainType::new("Ethereum"),
        blockchain_asset_id: BlockchainAssetId::new("ETH"),
        include_fee: false,
        endpoints_configuration: EndpointsConfiguration::SingleDestination,
        occurred_at: at(0),
    }
}

/// Events of one transaction attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Attempt {
    pub number: u32,
    pub mode: LockingMode,
}

impl Attempt {
    pub fn new(number: u32, mode: LockingMode) -> Self {
        Self { number, mode }
    }

    pub fn id(&self) -> TransactionId {
        transaction_id(self.number)
    }

    pub fn started(&self) -> TransactionExecutionStarted {
        TransactionExecutionStarted {
            operation_id: operation_id(),
            transaction_id: self.id(),
            transaction_number: self.number,
            from_address: Address::new("source"),
            outputs: outputs(),
            asset_id: AssetId::new("ETH"),
            blockchain_type: BlockchainType::new("Ethereum"),
            blockchain_asset_id: BlockchainAssetId::new("ETH"),
            include_fee: false,
            occurred_at: at(1),
        }
    }

    pub fn id_generated(&self) -> ExecutorEvent {
        ActiveTransactionIdGenerated {
            operation_id: operation_id(),
            transaction_id: self.id(),
            transaction_number: self.number,
            occurred_at: at(1),
        }
        .into()
    }

    pub fn execution_started(&self) -> ExecutorEvent {
        self.started().into()
    }

    pub fn locked(&self) -> ExecutorEvent {
        SourceAddressLocked {
            operation_id: operation_id(),
            transaction_id: self.id(),
            locking: self.mode,
            occurred_at: at(2),
        }
        .into()
    }

    pub fn built(&self) -> ExecutorEvent {
        TransactionBuilt {
            operation_id: operation_id(),
            transaction_id: self.id(),
            transaction_context: "unsigned-tx".to_string(),
            source_address_context: "nonce-7".to_string(),
            occurred_at: at(3),
        }
        .into()
    }

    pub fn signed(&self) -> ExecutorEvent {
        TransactionSigned {
            operation_id: operation_id(),
            transaction_id: self.id(),
            signed_transaction: "signed-tx".to_string(),
            occurred_at: at(4),
        }
        .into()
    }

    pub fn broadcasted(&self) -> ExecutorEvent {
        TransactionBroadcasted {
            operation_id: operation_id(),
            transaction_id: self.id(),
            occurred_at: at(5),
        }
        .into()
    }

    pub fn released(&self) -> ExecutorEvent {
        self.release(false)
    }

    pub fn release(&self, abort_workflow: bool) -> ExecutorEvent {
        SourceAddressLockReleased {
            operation_id: operation_id(),
            transaction_id: self.id(),
            locking: self.mode,
            abort_workflow,
            occurred_at: at(6),
        }
        .into()
    }

    pub fn waiting_started(&self) -> ExecutorEvent {
        TransactionEndingWaitingStarted {
            operation_id: operation_id(),
            transaction_id: self.id(),
            occurred_at: at(7),
        }
        .into()
    }

    pub fn completed(&self) -> ExecutorEvent {
        TransactionExecutionCompleted {
            operation_id: operation_id(),
            transaction_id: self.id(),
            transaction_number: self.number,
            outputs: outputs(),
            fee: Decimal::new(1, 3),
            block: 1_000,
            hash: "0xhash".to_string(),
            occurred_at: at(8),
        }
        .into()
    }

    pub fn failed(&self) -> ExecutorEvent {
        TransactionExecutionFailed {
            operation_id: operation_id(),
            transaction_id: self.id(),
            transaction_number: self.number,
            error_code: TransactionExecutionErrorCode::AmountIsTooSmall,
            error: "amount is too small".to_string(),
            occurred_at: at(8),
        }
        .into()
    }

    pub fn repeat_requested(&self) -> ExecutorEvent {
        TransactionExecutionRepeatRequested {
            operation_id: operation_id(),
            transaction_id: self.id(),
            transaction_number: self.number,
            error_code: TransactionExecutionErrorCode::RebuildingIsRequired,
            error: "rebuild required".to_string(),
            occurred_at: at(8),
        }
        .into()
    }

    pub fn building_rejected(&self) -> ExecutorEvent {
        TransactionBuildingRejected {
            operation_id: operation_id(),
            transaction_id: self.id(),
            occurred_at: at(3),
        }
        .into()
    }

    pub fn cleared(&self) -> ExecutorEvent {
        BroadcastedTransactionCleared {
            operation_id: operation_id(),
            transaction_id: self.id(),
            occurred_at: at(9),
        }
        .into()
    }

    /// A representative event of `kind` for this attempt.
    pub fn sample(&self, kind: ExecutorEventKind) -> ExecutorEvent {
        match kind {
            ExecutorEventKind::OperationExecutionStarted => operation_started().into(),
            ExecutorEventKind::ActiveTransactionIdGenerated => self.id_generated(),
            ExecutorEventKind::TransactionExecutionStarted => self.execution_started(),
            ExecutorEventKind::SourceAddressLocked => self.locked(),
            ExecutorEventKind::TransactionBuilt => self.built(),
            ExecutorEventKind::TransactionSigned => self.signed(),
            ExecutorEventKind::TransactionBroadcasted => self.broadcasted(),
            ExecutorEventKind::SourceAddressLockReleased => self.released(),
            ExecutorEventKind::TransactionEndingWaitingStarted => self.waiting_started(),
            ExecutorEventKind::TransactionExecutionCompleted => self.completed(),
            ExecutorEventKind::TransactionExecutionFailed => self.failed(),
            ExecutorEventKind::TransactionExecutionRepeatRequested => self.repeat_requested(),
            ExecutorEventKind::TransactionBuildingRejected => self.building_rejected(),
            ExecutorEventKind::BroadcastedTransactionCleared => self.cleared(),
            ExecutorEventKind::OperationExecutionCompleted => single_completed(),
            ExecutorEventKind::OneToManyOperationExecutionCompleted => {
                OneToManyOperationExecutionCompleted {
                    operation_id: operation_id(),
                    from_address: Address::new("source"),
                    outputs: outputs(),
                    asset_id: AssetId::new("ETH"),
                    fee: Decimal::new(1, 3),
                    block: 1_000,
                    hash: "0xhash".to_string(),
                    occurred_at: at(10),
                }
                .into()
            }
            ExecutorEventKind::OperationExecutionFailed => operation_failed(),
        }
    }
}

pub(crate) fn single_completed() -> ExecutorEvent {
    OperationExecutionCompleted {
        operation_id: operation_id(),
        from_address: Address::new("source"),
        to_address: Address::new("dest-1"),
        asset_id: AssetId::new("ETH"),
        amount: Decimal::new(125, 2),
        fee: Decimal::new(1, 3),
        block: 1_000,
        hash: "0xhash".to_string(),
        occurred_at: at(10),
    }
    .into()
}

pub(crate) fn operation_failed() -> ExecutorEvent {
    OperationExecutionFailed {
        operation_id: operation_id(),
        error_code: OperationExecutionErrorCode::AmountIsTooSmall,
        error: "amount is too small".to_string(),
        occurred_at: at(10),
    }
    .into()
}
