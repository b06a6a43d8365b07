//! Transaction state table, one per locking mode.
//!
//! ```text
//! Started ─locked→ Locked ─built→ Built ─signed→ Signed ─broadcasted→ Broadcasted
//!                    │                             │                     │
//!                 failed/repeat                 failed/repeat          released
//!                    ↓                             ↓                     ↓
//!              BuildingFailed ──released──→ Released ←──released── BroadcastingFailed
//!                                             │    │
//!                      (no failure) waiting ←─┘    └─→ cleared (failure recorded)
//!                                  ↓
//!                           WaitingForEnding ─completed→ Completed ─cleared→ Cleared
//!                                  │
//!                            failed/repeat → WaitingForEndingFailed ─cleared→ Cleared
//! ```
//!
//! `Locked`/`Released` are `SourceAddress*` for simple locking and
//! `SourceAndTargetAddresses*` for exclusive locking.

use txexec_core::{StateSwitcher, StateSwitcherBuilder, SwitcherBuildError};

use crate::common::{CompletedTransaction, LockingMode};
use crate::events::{
    BroadcastedTransactionCleared, ExecutorEvent, SourceAddressLockReleased, SourceAddressLocked,
    TransactionBroadcasted, TransactionBuilt, TransactionEndingWaitingStarted,
    TransactionExecutionCompleted, TransactionExecutionFailed,
    TransactionExecutionRepeatRequested, TransactionSigned,
};

use super::aggregate::TransactionExecution;
use super::state::{TransactionExecutionResult, TransactionExecutionState};

pub type TransactionSwitcher =
    StateSwitcher<TransactionExecution, TransactionExecutionState, ExecutorEvent>;

type TransactionSwitcherBuilder =
    StateSwitcherBuilder<TransactionExecution, TransactionExecutionState, ExecutorEvent>;

/// Build the transaction state table for `mode`.
pub fn transaction_transitions(
    mode: LockingMode,
) -> Result<TransactionSwitcher, SwitcherBuildError> {
    use TransactionExecutionState as S;

    let locked = S::locked(mode);
    let released = S::released(mode);

    let mut builder = TransactionSwitcher::builder()
        .state_accessor(|tx: &TransactionExecution| tx.state())
        .transition::<SourceAddressLocked>(S::Started)
        .precondition(
            move |_, e| e.locking == mode,
            move |_, e| locking_mismatch(mode, e.locking),
        )
        .apply(|tx, e| tx.on_source_address_locked(e.locking, e.occurred_at))
        .transition::<TransactionBuilt>(locked)
        .apply(|tx, e| tx.on_built(e))
        .transition::<TransactionSigned>(S::Built)
        .apply(|tx, e| tx.on_signed(&e.signed_transaction, e.occurred_at))
        .transition::<TransactionBroadcasted>(S::Signed)
        .apply(|tx, e| tx.on_broadcasted(e.occurred_at))
        .transition::<TransactionEndingWaitingStarted>(released)
        .precondition(
            |tx, _| !tx.has_failed(),
            |tx, _| format!("a failed attempt ({:?}) cannot wait for its ending", tx.result()),
        )
        .apply(|tx, e| tx.on_waiting_for_ending_started(e.occurred_at))
        .transition::<TransactionExecutionCompleted>(S::WaitingForEnding)
        .apply(|tx, e| {
            let completion = CompletedTransaction {
                outputs: e.outputs.clone(),
                fee: e.fee,
                block: e.block,
                hash: e.hash.clone(),
            };
            tx.on_completed(completion, e.occurred_at)
        })
        .transition::<BroadcastedTransactionCleared>(released)
        .precondition(
            |tx, _| tx.has_failed(),
            |_, _| "a successful attempt is cleared only after completion".to_string(),
        )
        .apply(|tx, e| tx.on_cleared(e.occurred_at))
        .transition::<BroadcastedTransactionCleared>(S::Completed)
        .apply(|tx, e| tx.on_cleared(e.occurred_at))
        .transition::<BroadcastedTransactionCleared>(S::WaitingForEndingFailed)
        .apply(|tx, e| tx.on_cleared(e.occurred_at));

    for (from, failed) in [
        (locked, S::BuildingFailed),
        (S::Signed, S::BroadcastingFailed),
        (S::WaitingForEnding, S::WaitingForEndingFailed),
    ] {
        builder = fail_from(builder, from, failed);
    }

    for from in [S::Broadcasted, S::BuildingFailed, S::BroadcastingFailed] {
        builder = release_from(builder, from, mode);
    }

    builder
        .ignore_in::<SourceAddressLocked>(&[
            locked,
            S::Built,
            S::Signed,
            S::Broadcasted,
            S::BuildingFailed,
            S::BroadcastingFailed,
            released,
            S::WaitingForEnding,
            S::Completed,
            S::WaitingForEndingFailed,
            S::Cleared,
        ])
        .ignore_in::<TransactionBuilt>(&[
            S::Built,
            S::Signed,
            S::Broadcasted,
            S::BuildingFailed,
            S::BroadcastingFailed,
            released,
            S::WaitingForEnding,
            S::Completed,
            S::WaitingForEndingFailed,
            S::Cleared,
        ])
        .ignore_in::<TransactionSigned>(&[
            S::Signed,
            S::Broadcasted,
            S::BroadcastingFailed,
            released,
            S::WaitingForEnding,
            S::Completed,
            S::WaitingForEndingFailed,
            S::Cleared,
        ])
        .ignore_in::<TransactionBroadcasted>(&[
            S::Broadcasted,
            S::BroadcastingFailed,
            released,
            S::WaitingForEnding,
            S::Completed,
            S::WaitingForEndingFailed,
            S::Cleared,
        ])
        .ignore_in::<SourceAddressLockReleased>(&[
            released,
            S::WaitingForEnding,
            S::Completed,
            S::WaitingForEndingFailed,
            S::Cleared,
        ])
        .ignore_in::<TransactionEndingWaitingStarted>(&[
            S::WaitingForEnding,
            S::Completed,
            S::WaitingForEndingFailed,
            S::Cleared,
        ])
        .ignore_in::<TransactionExecutionCompleted>(&[S::Completed, S::Cleared])
        .ignore_in::<TransactionExecutionFailed>(&failure_replay_states(released))
        .ignore_in::<TransactionExecutionRepeatRequested>(&failure_replay_states(released))
        .ignore::<BroadcastedTransactionCleared>(S::Cleared)
        .build()
}

/// States in which a redelivered failure or repeat request is a replay, or
/// lost a race against the other outcome of the same step.
fn failure_replay_states(released: TransactionExecutionState) -> [TransactionExecutionState; 8] {
    use TransactionExecutionState as S;
    [
        S::Built,
        S::Broadcasted,
        S::BuildingFailed,
        S::BroadcastingFailed,
        released,
        S::Completed,
        S::WaitingForEndingFailed,
        S::Cleared,
    ]
}

fn fail_from(
    builder: TransactionSwitcherBuilder,
    from: TransactionExecutionState,
    failed: TransactionExecutionState,
) -> TransactionSwitcherBuilder {
    builder
        .transition::<TransactionExecutionFailed>(from)
        .apply(move |tx, e| {
            tx.on_failed(
                failed,
                TransactionExecutionResult::Failed,
                e.error_code,
                &e.error,
                e.occurred_at,
            )
        })
        .transition::<TransactionExecutionRepeatRequested>(from)
        .apply(move |tx, e| {
            tx.on_failed(
                failed,
                TransactionExecutionResult::RepeatRequested,
                e.error_code,
                &e.error,
                e.occurred_at,
            )
        })
}

fn release_from(
    builder: TransactionSwitcherBuilder,
    from: TransactionExecutionState,
    mode: LockingMode,
) -> TransactionSwitcherBuilder {
    builder
        .transition::<SourceAddressLockReleased>(from)
        .precondition(
            move |_, e| e.locking == mode,
            move |_, e| locking_mismatch(mode, e.locking),
        )
        .precondition(
            |_, e| !e.abort_workflow,
            |_, _| "an aborting release does not advance the workflow".to_string(),
        )
        .apply(|tx, e| tx.on_source_address_released(e.locking, e.occurred_at))
}

fn locking_mismatch(expected: LockingMode, actual: LockingMode) -> String {
    format!("locks were handled with {actual:?} locking but the table expects {expected:?}")
}
