//! `txexec-execution`: transfer execution domain.
//!
//! Holds the two workflow aggregates, their state tables, and the command and
//! event contracts exchanged with handlers and callers. No IO: everything
//! here is driven by the sagas and handlers in the infra crate.

pub mod adapter;
pub mod commands;
pub mod common;
pub mod errors;
pub mod events;
pub mod operation;
pub mod transaction;

#[cfg(test)]
pub(crate) mod fixtures;

pub use adapter::{BroadcastOutcome, BuildOutcome, TransactionEnding};
pub use commands::ExecutorCommand;
pub use common::{
    Address, AssetId, BlockchainAssetId, BlockchainType, CompletedTransaction,
    EndpointsConfiguration, LockingMode, TransactionOutput, validate_outputs,
};
pub use errors::{
    OperationExecutionError, OperationExecutionErrorCode, TransactionExecutionError,
    TransactionExecutionErrorCode,
};
pub use events::{ExecutorEvent, ExecutorEventKind};
pub use operation::{
    OperationExecution, OperationExecutionResult, OperationExecutionState, OperationSwitcher,
    operation_transitions,
};
pub use transaction::{
    TransactionExecution, TransactionExecutionResult, TransactionExecutionState,
    TransactionSwitcher, transaction_transitions,
};
