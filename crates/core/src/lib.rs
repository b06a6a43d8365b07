//! `txexec-core`: foundation building blocks for the transfer executor.
//!
//! This crate contains **pure** primitives (no IO, no async): identifiers,
//! the domain error model, versioned aggregate roots and the declarative
//! state switcher used by every workflow aggregate.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod switcher;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{OperationId, TransactionId};
pub use switcher::{
    ClosedSet, EventVariant, RuleKind, StateSwitcher, StateSwitcherBuilder, SwitchEvent,
    SwitcherBuildError, UnexpectedEventError,
};
pub use value_object::ValueObject;
