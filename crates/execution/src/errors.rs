//! Error classification reported to the workflows and to the caller.

use serde::{Deserialize, Serialize};

/// Why a transaction attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionExecutionErrorCode {
    Unknown,
    AmountIsTooSmall,
    RebuildingIsRequired,
    NotEnoughBalance,
}

/// Why an operation failed, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationExecutionErrorCode {
    Unknown,
    AmountIsTooSmall,
    RebuildingIsRequired,
    NotEnoughBalance,
    /// Rejected before start: empty outputs or a non-positive amount.
    InvalidRequest,
    /// Rejected before start: the asset is not known to any integration.
    UnknownAsset,
}

impl From<TransactionExecutionErrorCode> for OperationExecutionErrorCode {
    fn from(value: TransactionExecutionErrorCode) -> Self {
        match value {
            TransactionExecutionErrorCode::Unknown => Self::Unknown,
            TransactionExecutionErrorCode::AmountIsTooSmall => Self::AmountIsTooSmall,
            TransactionExecutionErrorCode::RebuildingIsRequired => Self::RebuildingIsRequired,
            TransactionExecutionErrorCode::NotEnoughBalance => Self::NotEnoughBalance,
        }
    }
}

/// Error recorded on a failed transaction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionExecutionError {
    pub code: TransactionExecutionErrorCode,
    pub message: String,
}

/// Error recorded on a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationExecutionError {
    pub code: OperationExecutionErrorCode,
    pub message: String,
}
