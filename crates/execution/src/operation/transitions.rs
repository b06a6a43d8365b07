//! Operation state table.
//!
//! ```text
//! Started ─id generated→ ActiveTransactionIdGenerated ─tx started→ InProgress
//!    ↑                                                          │
//!    └── ActiveTransactionCleared ←──── repeat requested ───────┤
//!                                                   completed ──┤── failed
//!                                                       ↓                ↓
//!                                                   Completed         Failed
//!                                                       └── notified ────┴→ NotifiedAboutEnding
//! ```

use txexec_core::{StateSwitcher, SwitcherBuildError};

use crate::common::CompletedTransaction;
use crate::errors::OperationExecutionErrorCode;
use crate::events::{
    ActiveTransactionIdGenerated, ExecutorEvent, OneToManyOperationExecutionCompleted,
    OperationExecutionCompleted, OperationExecutionFailed, TransactionExecutionCompleted,
    TransactionExecutionFailed, TransactionExecutionRepeatRequested, TransactionExecutionStarted,
};

use super::aggregate::OperationExecution;
use super::state::OperationExecutionState;

pub type OperationSwitcher =
    StateSwitcher<OperationExecution, OperationExecutionState, ExecutorEvent>;

/// Build the operation state table.
///
/// With `max_transaction_attempts` set, a repeat request for the attempt with
/// that number fails the operation instead of starting another attempt.
pub fn operation_transitions(
    max_transaction_attempts: Option<u32>,
) -> Result<OperationSwitcher, SwitcherBuildError> {
    use OperationExecutionState as S;

    let same_generation = |op: &OperationExecution, e: &ActiveTransactionIdGenerated| {
        op.active_transaction_number() == e.transaction_number
            && op.is_active_transaction(e.transaction_id)
    };

    OperationSwitcher::builder()
        .state_accessor(|op: &OperationExecution| op.state())
        .transition::<ActiveTransactionIdGenerated>(S::Started)
        .precondition(next_number, unexpected_number)
        .apply(|op, e| {
            op.on_active_transaction_id_generated(e.transaction_id, e.transaction_number)
        })
        .transition::<ActiveTransactionIdGenerated>(S::ActiveTransactionCleared)
        .precondition(next_number, unexpected_number)
        .apply(|op, e| {
            op.on_active_transaction_id_generated(e.transaction_id, e.transaction_number)
        })
        .transition::<TransactionExecutionStarted>(S::ActiveTransactionIdGenerated)
        .precondition(
            |op, e| op.is_active_transaction(e.transaction_id),
            |op, e| not_active(op, e.transaction_id),
        )
        .apply(|op, e| op.on_transaction_execution_started(e.occurred_at))
        .transition::<TransactionExecutionCompleted>(S::TransactionExecutionInProgress)
        .precondition(
            |op, e| op.is_active_transaction(e.transaction_id),
            |op, e| not_active(op, e.transaction_id),
        )
        .apply(|op, e| {
            let completion = CompletedTransaction {
                outputs: e.outputs.clone(),
                fee: e.fee,
                block: e.block,
                hash: e.hash.clone(),
            };
            op.on_completed(completion, e.occurred_at)
        })
        .transition::<TransactionExecutionFailed>(S::TransactionExecutionInProgress)
        .precondition(
            |op, e| op.is_active_transaction(e.transaction_id),
            |op, e| not_active(op, e.transaction_id),
        )
        .apply(|op, e| op.on_failed(e.error_code.into(), &e.error, e.occurred_at))
        .transition::<TransactionExecutionRepeatRequested>(S::TransactionExecutionInProgress)
        .precondition(
            |op, e| op.is_active_transaction(e.transaction_id),
            |op, e| not_active(op, e.transaction_id),
        )
        .apply(move |op, e| {
            if max_transaction_attempts.is_some_and(|max| e.transaction_number >= max) {
                op.on_failed(
                    OperationExecutionErrorCode::RebuildingIsRequired,
                    &format!(
                        "gave up after {} transaction attempts: {}",
                        e.transaction_number, e.error
                    ),
                    e.occurred_at,
                );
            } else {
                op.on_active_transaction_cleared();
            }
        })
        .transition::<OperationExecutionCompleted>(S::Completed)
        .apply(|op, e| op.on_notified_about_ending(e.occurred_at))
        .transition::<OneToManyOperationExecutionCompleted>(S::Completed)
        .apply(|op, e| op.on_notified_about_ending(e.occurred_at))
        .transition::<OperationExecutionFailed>(S::Failed)
        .apply(|op, e| op.on_notified_about_ending(e.occurred_at))
        .ignore_when_in::<ActiveTransactionIdGenerated, _>(
            &[
                S::ActiveTransactionIdGenerated,
                S::TransactionExecutionInProgress,
                S::Completed,
                S::Failed,
            ],
            same_generation,
        )
        .ignore::<ActiveTransactionIdGenerated>(S::NotifiedAboutEnding)
        .ignore_in::<TransactionExecutionStarted>(&[
            S::TransactionExecutionInProgress,
            S::ActiveTransactionCleared,
            S::Completed,
            S::Failed,
            S::NotifiedAboutEnding,
        ])
        .ignore_in::<TransactionExecutionCompleted>(&[S::Completed, S::NotifiedAboutEnding])
        .ignore_in::<TransactionExecutionFailed>(&[S::Failed, S::NotifiedAboutEnding])
        .ignore_in::<TransactionExecutionRepeatRequested>(&[
            S::ActiveTransactionCleared,
            S::Failed,
            S::NotifiedAboutEnding,
        ])
        .ignore::<OperationExecutionCompleted>(S::NotifiedAboutEnding)
        .ignore::<OneToManyOperationExecutionCompleted>(S::NotifiedAboutEnding)
        .ignore::<OperationExecutionFailed>(S::NotifiedAboutEnding)
        .build()
}

fn next_number(op: &OperationExecution, e: &ActiveTransactionIdGenerated) -> bool {
    e.transaction_number == op.active_transaction_number() + 1
}

fn unexpected_number(op: &OperationExecution, e: &ActiveTransactionIdGenerated) -> String {
    format!(
        "transaction number {} does not follow the active number {}",
        e.transaction_number,
        op.active_transaction_number()
    )
}

fn not_active(op: &OperationExecution, transaction_id: txexec_core::TransactionId) -> String {
    format!(
        "transaction {transaction_id} is not the active transaction ({:?})",
        op.active_transaction_id()
    )
}
