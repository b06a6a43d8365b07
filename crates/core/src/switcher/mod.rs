//! Declarative state transition tables.
//!
//! A [`StateSwitcherBuilder`] collects, per `(state, event kind)` pair, either
//! a **transition** (preconditions + mutation) or an **ignore** rule (replay of
//! an event that was already applied). `build()` validates the whole table once
//! and produces an immutable [`StateSwitcher`] that dispatches by table lookup.
//!
//! ## Dispatch
//!
//! `switch(aggregate, event)`:
//!
//! 1. reads the current state through the registered accessor
//! 2. ignore rule (guard passes) → `Ok(false)`, nothing mutated
//! 3. transition → every precondition is evaluated; any failure yields an
//!    [`UnexpectedEventError`] carrying all failure messages, otherwise the
//!    mutation runs and `Ok(true)` is returned
//! 4. no rule → [`UnexpectedEventError`]
//!
//! An `UnexpectedEventError` is a defect signal: either an ignore rule is
//! missing or the aggregate is corrupt. Callers must not swallow it.

mod builder;
mod error;

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

pub use builder::{StateSwitcherBuilder, TransitionBuilder};
pub use error::{SwitcherBuildError, UnexpectedEventError};

/// A closed, enumerable set of values (a state enum or an event kind enum).
pub trait ClosedSet: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Every member of the set, each exactly once.
    fn members() -> &'static [Self];
}

/// An event that can be dispatched through a switcher.
pub trait SwitchEvent: Debug {
    type Kind: ClosedSet;

    fn kind(&self) -> Self::Kind;
}

/// Typed access to one variant of a [`SwitchEvent`] enum.
///
/// Registrations are made per payload type so preconditions and mutations
/// receive the concrete payload instead of the whole enum.
pub trait EventVariant<E: SwitchEvent>: Sized + 'static {
    const KIND: E::Kind;

    fn extract(event: &E) -> Option<&Self>;
}

/// What the table holds for a `(state, kind)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Transition,
    Ignore,
    GuardedIgnore,
}

type Check<A, E> = Box<dyn Fn(&A, &E) -> bool + Send + Sync>;
type Message<A, E> = Box<dyn Fn(&A, &E) -> String + Send + Sync>;
type Mutation<A, E> = Box<dyn Fn(&mut A, &E) + Send + Sync>;

pub(crate) struct Precondition<A, E> {
    check: Check<A, E>,
    message: Message<A, E>,
}

pub(crate) enum Rule<A, E> {
    Transition {
        preconditions: Vec<Precondition<A, E>>,
        mutation: Mutation<A, E>,
    },
    Ignore {
        guard: Option<Check<A, E>>,
    },
}

impl<A, E> Rule<A, E> {
    fn kind(&self) -> RuleKind {
        match self {
            Rule::Transition { .. } => RuleKind::Transition,
            Rule::Ignore { guard: None } => RuleKind::Ignore,
            Rule::Ignore { guard: Some(_) } => RuleKind::GuardedIgnore,
        }
    }
}

/// Immutable, validated transition table for aggregate `A` with state `S`.
pub struct StateSwitcher<A, S, E>
where
    S: ClosedSet,
    E: SwitchEvent,
{
    accessor: Box<dyn Fn(&A) -> S + Send + Sync>,
    rules: HashMap<(S, E::Kind), Rule<A, E>>,
}

impl<A, S, E> StateSwitcher<A, S, E>
where
    S: ClosedSet,
    E: SwitchEvent,
{
    pub fn builder() -> StateSwitcherBuilder<A, S, E>
    where
        A: 'static,
        E: 'static,
    {
        StateSwitcherBuilder::new()
    }

    /// Validate `event` against the current state of `aggregate` and apply it.
    ///
    /// Returns `Ok(true)` when the transition was applied and `Ok(false)` when
    /// the event was ignored as a replay.
    pub fn switch(&self, aggregate: &mut A, event: &E) -> Result<bool, UnexpectedEventError> {
        let state = (self.accessor)(aggregate);
        let kind = event.kind();

        match self.rules.get(&(state, kind)) {
            Some(Rule::Ignore { guard: None }) => Ok(false),
            Some(Rule::Ignore { guard: Some(guard) }) => {
                if guard(aggregate, event) {
                    Ok(false)
                } else {
                    Err(self.unexpected(state, kind, "ignore guard rejected the event".to_string()))
                }
            }
            Some(Rule::Transition {
                preconditions,
                mutation,
            }) => {
                let failures: Vec<String> = preconditions
                    .iter()
                    .filter(|p| !(p.check)(aggregate, event))
                    .map(|p| (p.message)(aggregate, event))
                    .collect();

                if !failures.is_empty() {
                    return Err(self.unexpected(state, kind, failures.join("; ")));
                }

                mutation(aggregate, event);
                Ok(true)
            }
            None => Err(self.unexpected(state, kind, "no transition registered".to_string())),
        }
    }

    pub fn current_state(&self, aggregate: &A) -> S {
        (self.accessor)(aggregate)
    }

    /// The registered rule for a pair, if any.
    pub fn rule(&self, state: S, kind: E::Kind) -> Option<RuleKind> {
        self.rules.get(&(state, kind)).map(Rule::kind)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn unexpected(&self, state: S, kind: E::Kind, reason: String) -> UnexpectedEventError {
        UnexpectedEventError {
            aggregate: std::any::type_name::<A>(),
            state: format!("{state:?}"),
            event: format!("{kind:?}"),
            reason,
        }
    }
}

impl<A, S, E> Debug for StateSwitcher<A, S, E>
where
    S: ClosedSet,
    E: SwitchEvent,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSwitcher")
            .field("aggregate", &std::any::type_name::<A>())
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
