use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{
    ClosedSet, EventVariant, Precondition, Rule, StateSwitcher, SwitchEvent, SwitcherBuildError,
};

/// Fluent registration of a transition table.
///
/// Registration never fails; every table defect (duplicate pair, undeclared
/// state, missing accessor) is reported by [`build`](Self::build).
pub struct StateSwitcherBuilder<A, S, E>
where
    S: ClosedSet,
    E: SwitchEvent,
{
    accessor: Option<Box<dyn Fn(&A) -> S + Send + Sync>>,
    entries: Vec<(S, E::Kind, Rule<A, E>)>,
}

impl<A, S, E> Default for StateSwitcherBuilder<A, S, E>
where
    A: 'static,
    S: ClosedSet,
    E: SwitchEvent + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, S, E> StateSwitcherBuilder<A, S, E>
where
    A: 'static,
    S: ClosedSet,
    E: SwitchEvent + 'static,
{
    pub fn new() -> Self {
        Self {
            accessor: None,
            entries: Vec::new(),
        }
    }

    /// How to read the current state of an aggregate.
    pub fn state_accessor(mut self, accessor: impl Fn(&A) -> S + Send + Sync + 'static) -> Self {
        self.accessor = Some(Box::new(accessor));
        self
    }

    /// Start registering a transition out of `from` on events of payload `P`.
    pub fn transition<P>(self, from: S) -> TransitionBuilder<A, S, E, P>
    where
        P: EventVariant<E>,
    {
        let payload_matches = Precondition {
            check: Box::new(|_: &A, e: &E| P::extract(e).is_some()),
            message: Box::new(|_: &A, e: &E| {
                format!(
                    "payload {:?} is not a {}",
                    e,
                    std::any::type_name::<P>()
                )
            }),
        };

        TransitionBuilder {
            parent: self,
            from,
            preconditions: vec![payload_matches],
            _payload: PhantomData,
        }
    }

    /// Silently drop events of payload `P` while in `state`.
    pub fn ignore<P>(mut self, state: S) -> Self
    where
        P: EventVariant<E>,
    {
        self.entries
            .push((state, P::KIND, Rule::Ignore { guard: None }));
        self
    }

    pub fn ignore_in<P>(mut self, states: &[S]) -> Self
    where
        P: EventVariant<E>,
    {
        for &state in states {
            self = self.ignore::<P>(state);
        }
        self
    }

    /// Ignore events of payload `P` in `state` only while `guard` holds;
    /// otherwise the event is unexpected.
    pub fn ignore_when<P, G>(self, state: S, guard: G) -> Self
    where
        P: EventVariant<E>,
        G: Fn(&A, &P) -> bool + Send + Sync + 'static,
    {
        self.ignore_when_in::<P, G>(&[state], guard)
    }

    pub fn ignore_when_in<P, G>(mut self, states: &[S], guard: G) -> Self
    where
        P: EventVariant<E>,
        G: Fn(&A, &P) -> bool + Send + Sync + 'static,
    {
        let guard = Arc::new(guard);
        for &state in states {
            let guard = Arc::clone(&guard);
            self.entries.push((
                state,
                P::KIND,
                Rule::Ignore {
                    guard: Some(Box::new(move |a: &A, e: &E| {
                        P::extract(e).is_some_and(|p| guard(a, p))
                    })),
                },
            ));
        }
        self
    }

    /// Validate the table and freeze it.
    pub fn build(self) -> Result<StateSwitcher<A, S, E>, SwitcherBuildError> {
        let accessor = self
            .accessor
            .ok_or(SwitcherBuildError::MissingStateAccessor)?;

        ensure_closed::<S>()?;
        ensure_closed::<E::Kind>()?;

        let mut rules = HashMap::with_capacity(self.entries.len());
        for (state, kind, rule) in self.entries {
            if !S::members().contains(&state) {
                return Err(SwitcherBuildError::UndeclaredState {
                    state: format!("{state:?}"),
                });
            }
            if !E::Kind::members().contains(&kind) {
                return Err(SwitcherBuildError::UndeclaredEvent {
                    event: format!("{kind:?}"),
                });
            }

            match rules.entry((state, kind)) {
                Entry::Occupied(existing) => {
                    let existing: &Rule<A, E> = existing.get();
                    return Err(SwitcherBuildError::DuplicateRule {
                        state: format!("{state:?}"),
                        event: format!("{kind:?}"),
                        existing: existing.kind(),
                        new: rule.kind(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(rule);
                }
            }
        }

        Ok(StateSwitcher { accessor, rules })
    }
}

/// A transition being registered; finished by [`apply`](Self::apply).
pub struct TransitionBuilder<A, S, E, P>
where
    S: ClosedSet,
    E: SwitchEvent,
{
    parent: StateSwitcherBuilder<A, S, E>,
    from: S,
    preconditions: Vec<Precondition<A, E>>,
    _payload: PhantomData<fn() -> P>,
}

impl<A, S, E, P> TransitionBuilder<A, S, E, P>
where
    A: 'static,
    S: ClosedSet,
    E: SwitchEvent + 'static,
    P: EventVariant<E>,
{
    /// Require `check` to hold before the mutation runs. `message` describes
    /// the failure and is only evaluated when the check fails.
    pub fn precondition<C, M>(mut self, check: C, message: M) -> Self
    where
        C: Fn(&A, &P) -> bool + Send + Sync + 'static,
        M: Fn(&A, &P) -> String + Send + Sync + 'static,
    {
        self.preconditions.push(Precondition {
            check: Box::new(move |a: &A, e: &E| P::extract(e).is_none_or(|p| check(a, p))),
            message: Box::new(move |a: &A, e: &E| {
                P::extract(e).map(|p| message(a, p)).unwrap_or_default()
            }),
        });
        self
    }

    /// Register the mutation and return to the table builder.
    pub fn apply<M>(self, mutation: M) -> StateSwitcherBuilder<A, S, E>
    where
        M: Fn(&mut A, &P) + Send + Sync + 'static,
    {
        let mut parent = self.parent;
        parent.entries.push((
            self.from,
            P::KIND,
            Rule::Transition {
                preconditions: self.preconditions,
                mutation: Box::new(move |a: &mut A, e: &E| {
                    if let Some(payload) = P::extract(e) {
                        mutation(a, payload);
                    }
                }),
            },
        ));
        parent
    }
}

fn ensure_closed<T: ClosedSet>() -> Result<(), SwitcherBuildError> {
    let members = T::members();
    if members.is_empty() {
        return Err(SwitcherBuildError::NotClosedEnumeration {
            type_name: std::any::type_name::<T>(),
            detail: "declares no members".to_string(),
        });
    }

    for (idx, member) in members.iter().enumerate() {
        if members[..idx].contains(member) {
            return Err(SwitcherBuildError::NotClosedEnumeration {
                type_name: std::any::type_name::<T>(),
                detail: format!("{member:?} is listed twice"),
            });
        }
    }

    Ok(())
}
