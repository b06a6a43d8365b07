use serde::{Deserialize, Serialize};

use txexec_core::ClosedSet;

/// Lifecycle of a caller-visible operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationExecutionState {
    Started,
    ActiveTransactionIdGenerated,
    TransactionExecutionInProgress,
    ActiveTransactionCleared,
    Completed,
    Failed,
    NotifiedAboutEnding,
}

impl ClosedSet for OperationExecutionState {
    fn members() -> &'static [Self] {
        use OperationExecutionState::*;
        &[
            Started,
            ActiveTransactionIdGenerated,
            TransactionExecutionInProgress,
            ActiveTransactionCleared,
            Completed,
            Failed,
            NotifiedAboutEnding,
        ]
    }
}

impl OperationExecutionState {
    /// The outcome is known (it may not have been notified yet).
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::NotifiedAboutEnding)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationExecutionResult {
    Completed,
    Failed,
}
