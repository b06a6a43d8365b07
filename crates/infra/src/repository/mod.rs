//! Aggregate persistence.
//!
//! Workflow aggregates are stored as versioned snapshots. Every write carries
//! the version the aggregate was read at and a stale write is rejected with
//! [`RepositoryError::Concurrency`]; callers re-read on redelivery.

mod in_memory;

#[cfg(test)]
pub(crate) mod fixtures;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use txexec_core::AggregateRoot;

pub use in_memory::InMemoryAggregateRepository;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The stored version moved since the aggregate was read.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    #[error("{aggregate_type} {id} not found")]
    NotFound {
        aggregate_type: &'static str,
        id: String,
    },

    #[error("snapshot serialization failed: {0}")]
    Serialization(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, Self::Concurrency(_))
    }
}

/// Bounds an aggregate needs to be stored as a snapshot.
pub trait StoredAggregate:
    AggregateRoot<Id: Send + Sync> + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<A> StoredAggregate for A where
    A: AggregateRoot<Id: Send + Sync> + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

#[async_trait]
pub trait AggregateRepository<A: StoredAggregate>: Send + Sync {
    /// Return the stored aggregate, or store `candidate` when none exists.
    ///
    /// This is the idempotency boundary for creation: concurrent calls for
    /// the same id all observe the same stored instance.
    async fn get_or_add(&self, candidate: A) -> Result<A, RepositoryError>;

    async fn try_get(&self, id: &A::Id) -> Result<Option<A>, RepositoryError>;

    async fn get(&self, id: &A::Id) -> Result<A, RepositoryError> {
        self.try_get(id).await?.ok_or_else(|| RepositoryError::NotFound {
            aggregate_type: A::AGGREGATE_TYPE,
            id: id.to_string(),
        })
    }

    /// Persist `aggregate` if the stored version still equals the version it
    /// was read at. Bumps the aggregate's version on success.
    async fn save(&self, aggregate: &mut A) -> Result<(), RepositoryError>;
}
