//! Domain error model.

use thiserror::Error;

use crate::aggregate::ExpectedVersion;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic domain failure.
///
/// Transport and storage problems are not represented here; they live in the
/// infra crate and are retried by redelivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Caller input rejected (empty outputs, non-positive amount).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An aggregate reached a state its invariants forbid.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Optimistic concurrency check failed on save.
    #[error("version conflict (expected {expected:?}, stored {stored:?})")]
    VersionConflict {
        expected: ExpectedVersion,
        stored: Option<u64>,
    },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
