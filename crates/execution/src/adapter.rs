//! Result taxonomy of the blockchain integration calls.
//!
//! Each call answers with a small closed enumeration. Transport failures are
//! not part of it: they are infrastructure errors and are retried.

use serde::{Deserialize, Serialize};

use crate::common::CompletedTransaction;
use crate::errors::TransactionExecutionErrorCode;

/// Outcome of building an unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildOutcome {
    /// Opaque, integration-specific unsigned transaction, plus the state of
    /// the source address it was built against (nonce, spent outputs).
    Built {
        transaction_context: String,
        source_address_context: String,
    },
    AmountIsTooSmall,
    NotEnoughBalance,
    RebuildRequired,
    Failed { message: String },
}

/// Outcome of broadcasting a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastOutcome {
    Broadcasted,
    /// The same transaction was broadcast before (redelivered command).
    AlreadyBroadcasted,
    AmountIsTooSmall,
    NotEnoughBalance,
    RebuildRequired,
    Failed { message: String },
}

/// Chain-level status of a broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEnding {
    InProgress,
    Completed(CompletedTransaction),
    Failed {
        code: TransactionExecutionErrorCode,
        message: String,
    },
}
