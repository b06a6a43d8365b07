use thiserror::Error;

use super::RuleKind;

/// Raised by `switch` for a pair with no rule, a failed precondition or a
/// rejected ignore guard.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unexpected event {event} for {aggregate} in state {state}: {reason}")]
pub struct UnexpectedEventError {
    pub aggregate: &'static str,
    pub state: String,
    pub event: String,
    pub reason: String,
}

/// Transition table defects detected by `build()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwitcherBuildError {
    #[error("no current state accessor was supplied")]
    MissingStateAccessor,

    #[error("{type_name} is not a closed enumeration: {detail}")]
    NotClosedEnumeration {
        type_name: &'static str,
        detail: String,
    },

    #[error("state {state} is not a member of the declared state set")]
    UndeclaredState { state: String },

    #[error("event kind {event} is not a member of the declared event kind set")]
    UndeclaredEvent { event: String },

    #[error("rule for ({state}, {event}) registered twice (existing: {existing:?}, new: {new:?})")]
    DuplicateRule {
        state: String,
        event: String,
        existing: RuleKind,
        new: RuleKind,
    },
}
