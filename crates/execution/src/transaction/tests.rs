use proptest::prelude::*;

use txexec_core::{AggregateRoot, ClosedSet, RuleKind};

use crate::common::LockingMode;
use crate::errors::TransactionExecutionErrorCode;
use crate::events::{ExecutorEvent, ExecutorEventKind};
use crate::fixtures::Attempt;

use super::*;

use TransactionExecutionState as S;

fn table(mode: LockingMode) -> TransactionSwitcher {
    transaction_transitions(mode).unwrap()
}

fn fresh(attempt: Attempt) -> TransactionExecution {
    TransactionExecution::start(&attempt.started())
}

fn happy_path(attempt: Attempt) -> Vec<ExecutorEvent> {
    vec![
        attempt.locked(),
        attempt.built(),
        attempt.signed(),
        attempt.broadcasted(),
        attempt.released(),
        attempt.waiting_started(),
        attempt.completed(),
        attempt.cleared(),
    ]
}

/// Events that lead a fresh aggregate into `state`, if reachable in `mode`.
fn path_to(state: TransactionExecutionState, attempt: Attempt) -> Option<Vec<ExecutorEvent>> {
    let happy = happy_path(attempt);
    let prefix = |n: usize| happy[..n].to_vec();
    let with = |mut events: Vec<ExecutorEvent>, last: ExecutorEvent| {
        events.push(last);
        events
    };

    let path = match state {
        S::Started => prefix(0),
        s if s == S::locked(attempt.mode) => prefix(1),
        S::Built => prefix(2),
        S::Signed => prefix(3),
        S::Broadcasted => prefix(4),
        s if s == S::released(attempt.mode) => prefix(5),
        S::WaitingForEnding => prefix(6),
        S::Completed => prefix(7),
        S::Cleared => prefix(8),
        S::BuildingFailed => with(prefix(1), attempt.failed()),
        S::BroadcastingFailed => with(prefix(3), attempt.failed()),
        S::WaitingForEndingFailed => with(prefix(6), attempt.repeat_requested()),
        _ => return None,
    };
    Some(path)
}

fn drive(
    table: &TransactionSwitcher,
    tx: &mut TransactionExecution,
    events: &[ExecutorEvent],
) -> Vec<TransactionExecutionState> {
    events
        .iter()
        .map(|e| {
            assert_eq!(table.switch(tx, e), Ok(true), "event {e:?}");
            tx.check_invariants().unwrap();
            tx.state()
        })
        .collect()
}

#[test]
fn both_tables_build() {
    for mode in [LockingMode::Simple, LockingMode::Exclusive] {
        assert!(table(mode).rule_count() > 0);
    }
}

#[test]
fn happy_path_visits_every_phase_in_order() {
    let attempt = Attempt::new(1, LockingMode::Simple);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);

    let states = drive(&table, &mut tx, &happy_path(attempt));

    assert_eq!(
        states,
        vec![
            S::SourceAddressLocked,
            S::Built,
            S::Signed,
            S::Broadcasted,
            S::SourceAddressReleased,
            S::WaitingForEnding,
            S::Completed,
            S::Cleared,
        ]
    );
    assert_eq!(tx.result(), Some(TransactionExecutionResult::Completed));
    assert_eq!(tx.completion().unwrap().hash, "0xhash");
    assert_eq!(tx.signed_transaction(), Some("signed-tx"));
    assert!(tx.timestamps().cleared_at.is_some());
}

#[test]
fn build_records_the_unsigned_transaction_and_the_source_address_state() {
    let attempt = Attempt::new(1, LockingMode::Simple);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);
    assert_eq!(tx.source_address_context(), None);

    drive(&table, &mut tx, &[attempt.locked(), attempt.built()]);

    assert_eq!(tx.transaction_context(), Some("unsigned-tx"));
    assert_eq!(tx.source_address_context(), Some("nonce-7"));
    assert_eq!(tx.timestamps().built_at, Some(crate::fixtures::at(3)));
}

#[test]
fn exclusive_locking_uses_source_and_target_states() {
    let attempt = Attempt::new(1, LockingMode::Exclusive);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);

    let states = drive(&table, &mut tx, &happy_path(attempt)[..5]);

    assert_eq!(states[0], S::SourceAndTargetAddressesLocked);
    assert_eq!(states[4], S::SourceAndTargetAddressesReleased);
}

#[test]
fn lock_event_of_other_mode_is_rejected() {
    let table = table(LockingMode::Exclusive);
    let simple = Attempt::new(1, LockingMode::Simple);
    let mut tx = fresh(simple);

    let err = table.switch(&mut tx, &simple.locked()).unwrap_err();

    assert!(err.reason.contains("Simple"));
    assert_eq!(tx.state(), S::Started);
}

#[test]
fn build_failure_is_released_then_cleared_without_waiting() {
    let attempt = Attempt::new(1, LockingMode::Simple);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);

    let states = drive(
        &table,
        &mut tx,
        &[
            attempt.locked(),
            attempt.failed(),
            attempt.released(),
            attempt.cleared(),
        ],
    );

    assert_eq!(
        states,
        vec![
            S::SourceAddressLocked,
            S::BuildingFailed,
            S::SourceAddressReleased,
            S::Cleared,
        ]
    );
    assert!(tx.timestamps().waiting_for_ending_started_at.is_none());
    assert_eq!(
        tx.error().unwrap().code,
        TransactionExecutionErrorCode::AmountIsTooSmall
    );
}

#[test]
fn failed_attempt_cannot_start_waiting() {
    let attempt = Attempt::new(1, LockingMode::Simple);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);
    drive(
        &table,
        &mut tx,
        &[attempt.locked(), attempt.repeat_requested(), attempt.released()],
    );

    let err = table
        .switch(&mut tx, &attempt.waiting_started())
        .unwrap_err();

    assert!(err.reason.contains("cannot wait"));
    assert_eq!(tx.state(), S::SourceAddressReleased);
}

#[test]
fn successful_attempt_is_not_cleared_before_completion() {
    let attempt = Attempt::new(1, LockingMode::Simple);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);
    drive(&table, &mut tx, &happy_path(attempt)[..5]);

    assert!(table.switch(&mut tx, &attempt.cleared()).is_err());
}

#[test]
fn repeat_requested_while_waiting_fails_the_waiting_phase() {
    let attempt = Attempt::new(1, LockingMode::Simple);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);
    drive(&table, &mut tx, &happy_path(attempt)[..6]);

    assert_eq!(table.switch(&mut tx, &attempt.repeat_requested()), Ok(true));

    assert_eq!(tx.state(), S::WaitingForEndingFailed);
    assert_eq!(tx.result(), Some(TransactionExecutionResult::RepeatRequested));
    assert_eq!(table.switch(&mut tx, &attempt.cleared()), Ok(true));
    assert_eq!(tx.state(), S::Cleared);
}

#[test]
fn broadcast_failure_goes_to_broadcasting_failed() {
    let attempt = Attempt::new(1, LockingMode::Simple);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);
    drive(&table, &mut tx, &happy_path(attempt)[..3]);

    assert_eq!(table.switch(&mut tx, &attempt.failed()), Ok(true));
    assert_eq!(tx.state(), S::BroadcastingFailed);
}

#[test]
fn aborting_release_never_advances_the_workflow() {
    let attempt = Attempt::new(1, LockingMode::Simple);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);
    drive(&table, &mut tx, &happy_path(attempt)[..4]);

    assert!(table.switch(&mut tx, &attempt.release(true)).is_err());
    assert_eq!(tx.state(), S::Broadcasted);
}

#[test]
fn cleared_ignores_every_transaction_event() {
    let attempt = Attempt::new(1, LockingMode::Simple);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);
    drive(&table, &mut tx, &happy_path(attempt));
    let snapshot = tx.clone();

    for event in happy_path(attempt)
        .into_iter()
        .chain([attempt.failed(), attempt.repeat_requested()])
    {
        assert_eq!(table.switch(&mut tx, &event), Ok(false));
    }
    assert_eq!(tx, snapshot);
}

#[test]
fn every_pair_without_a_rule_is_unexpected() {
    for mode in [LockingMode::Simple, LockingMode::Exclusive] {
        let table = table(mode);
        let attempt = Attempt::new(1, mode);

        for &state in TransactionExecutionState::members() {
            let Some(path) = path_to(state, attempt) else {
                continue;
            };

            for &kind in ExecutorEventKind::members() {
                let mut tx = fresh(attempt);
                drive(&table, &mut tx, &path);
                assert_eq!(tx.state(), state);
                let before = tx.clone();

                let outcome = table.switch(&mut tx, &attempt.sample(kind));
                match table.rule(state, kind) {
                    None => {
                        let err = outcome.unwrap_err();
                        assert_eq!(err.reason, "no transition registered");
                        assert_eq!(tx, before);
                    }
                    Some(RuleKind::Ignore) | Some(RuleKind::GuardedIgnore) => {
                        assert_eq!(outcome, Ok(false), "{state:?} / {kind:?}");
                        assert_eq!(tx, before);
                    }
                    Some(RuleKind::Transition) => {
                        if let Err(err) = outcome {
                            assert_ne!(err.reason, "no transition registered");
                            assert_eq!(tx, before);
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn snapshot_round_trip_preserves_fields() {
    let attempt = Attempt::new(3, LockingMode::Exclusive);
    let table = table(attempt.mode);
    let mut tx = fresh(attempt);
    drive(&table, &mut tx, &happy_path(attempt)[..7]);

    let json = serde_json::to_string(&tx).unwrap();
    let mut restored: TransactionExecution = serde_json::from_str(&json).unwrap();
    restored.set_version(tx.version());

    assert_eq!(restored, tx);
    assert_eq!(restored.state(), S::Completed);
}

fn mode_strategy() -> impl Strategy<Value = LockingMode> {
    prop_oneof![Just(LockingMode::Simple), Just(LockingMode::Exclusive)]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn replaying_the_last_event_is_ignored(mode in mode_strategy(), steps in 1usize..=8) {
        let attempt = Attempt::new(1, mode);
        let table = table(mode);
        let events = happy_path(attempt);
        let mut tx = fresh(attempt);

        for event in &events[..steps] {
            prop_assert_eq!(table.switch(&mut tx, event), Ok(true));
        }
        let applied = tx.clone();

        prop_assert_eq!(table.switch(&mut tx, &events[steps - 1]), Ok(false));
        prop_assert_eq!(tx, applied);
    }

    #[test]
    fn stale_events_never_move_state_backwards(
        mode in mode_strategy(),
        steps in 2usize..=8,
        pick in 0usize..8,
    ) {
        let attempt = Attempt::new(1, mode);
        let table = table(mode);
        let events = happy_path(attempt);
        let mut tx = fresh(attempt);

        for event in &events[..steps] {
            prop_assert_eq!(table.switch(&mut tx, event), Ok(true));
        }
        let applied = tx.clone();

        let stale = &events[pick % steps];
        prop_assert_eq!(table.switch(&mut tx, stale), Ok(false));
        prop_assert_eq!(tx, applied);
    }
}
