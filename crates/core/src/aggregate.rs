//! Aggregate root trait for versioned, state-stored domain models.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// Workflow aggregates are persisted as snapshots of their current state. The
/// version is an opaque concurrency token: a store compares it on every write
/// and assigns the next one after a successful save.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Stable aggregate type name (e.g. "execution.transaction").
    const AGGREGATE_TYPE: &'static str;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Version this instance was read at (0 for a never-persisted instance).
    fn version(&self) -> u64;

    /// Called by stores after a successful write.
    fn set_version(&mut self, version: u64);
}

/// Optimistic concurrency expectation for a write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The aggregate must not be stored yet.
    Absent,
    /// Require the stored aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expectation derived from the version an aggregate was read at.
    pub fn of<A: AggregateRoot>(aggregate: &A) -> Self {
        match aggregate.version() {
            0 => ExpectedVersion::Absent,
            v => ExpectedVersion::Exact(v),
        }
    }

    /// `actual` is `None` when nothing is stored under the id.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::Absent, None) => true,
            (ExpectedVersion::Exact(expected), Some(found)) => expected == found,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::VersionConflict {
                expected: self,
                stored: actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_matches_only_missing_aggregates() {
        assert!(ExpectedVersion::Absent.matches(None));
        assert!(!ExpectedVersion::Absent.matches(Some(1)));
    }

    #[test]
    fn exact_matches_only_the_same_version() {
        assert!(ExpectedVersion::Exact(3).matches(Some(3)));
        assert!(!ExpectedVersion::Exact(3).matches(Some(4)));
        assert!(!ExpectedVersion::Exact(3).matches(None));
    }

    #[test]
    fn check_reports_conflict() {
        let err = ExpectedVersion::Exact(2).check(Some(5)).unwrap_err();
        assert!(err.is_version_conflict());
        assert_eq!(
            err,
            DomainError::VersionConflict {
                expected: ExpectedVersion::Exact(2),
                stored: Some(5),
            }
        );
    }
}
