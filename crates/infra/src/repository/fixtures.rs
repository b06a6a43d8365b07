//! Repository doubles for saga tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::{AggregateRepository, InMemoryAggregateRepository, RepositoryError, StoredAggregate};

/// In-memory repository where another delivery can win the next save.
pub(crate) struct RacedRepository<A: StoredAggregate> {
    inner: InMemoryAggregateRepository<A>,
    lose_next_save: AtomicBool,
}

impl<A: StoredAggregate + Clone> RacedRepository<A> {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryAggregateRepository::new(),
            lose_next_save: AtomicBool::new(false),
        }
    }

    /// The next save finds the same aggregate already written by a
    /// concurrent delivery of the same message.
    pub(crate) fn lose_next_save(&self) {
        self.lose_next_save.store(true, Ordering::SeqCst);
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    pub(crate) fn version_of(&self, id: &A::Id) -> Option<u64> {
        self.inner.version_of(id)
    }
}

#[async_trait]
impl<A: StoredAggregate + Clone> AggregateRepository<A> for RacedRepository<A> {
    async fn get_or_add(&self, candidate: A) -> Result<A, RepositoryError> {
        self.inner.get_or_add(candidate).await
    }

    async fn try_get(&self, id: &A::Id) -> Result<Option<A>, RepositoryError> {
        self.inner.try_get(id).await
    }

    async fn save(&self, aggregate: &mut A) -> Result<(), RepositoryError> {
        if self.lose_next_save.swap(false, Ordering::SeqCst) {
            let mut winner = aggregate.clone();
            self.inner.save(&mut winner).await?;
        }
        self.inner.save(aggregate).await
    }
}
