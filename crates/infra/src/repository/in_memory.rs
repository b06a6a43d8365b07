use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use txexec_core::ExpectedVersion;

use super::{AggregateRepository, RepositoryError, StoredAggregate};

#[derive(Debug, Clone)]
struct Snapshot {
    version: u64,
    state: JsonValue,
}

/// In-memory snapshot store.
///
/// Aggregates round-trip through `serde_json` so a test observes exactly what
/// a persistent store would hand back. Intended for tests/dev.
#[derive(Debug)]
pub struct InMemoryAggregateRepository<A: StoredAggregate> {
    snapshots: RwLock<HashMap<A::Id, Snapshot>>,
}

impl<A: StoredAggregate> Default for InMemoryAggregateRepository<A> {
    fn default() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
        }
    }
}

impl<A: StoredAggregate> InMemoryAggregateRepository<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored version of `id`, if any.
    pub fn version_of(&self, id: &A::Id) -> Option<u64> {
        self.snapshots
            .read()
            .ok()
            .and_then(|s| s.get(id).map(|snapshot| snapshot.version))
    }

    fn restore(snapshot: &Snapshot) -> Result<A, RepositoryError> {
        let mut aggregate: A = serde_json::from_value(snapshot.state.clone())
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        aggregate.set_version(snapshot.version);
        Ok(aggregate)
    }

    fn capture(aggregate: &A) -> Result<JsonValue, RepositoryError> {
        serde_json::to_value(aggregate).map_err(|e| RepositoryError::Serialization(e.to_string()))
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Storage("lock poisoned".to_string())
}

#[async_trait]
impl<A: StoredAggregate> AggregateRepository<A> for InMemoryAggregateRepository<A> {
    async fn get_or_add(&self, candidate: A) -> Result<A, RepositoryError> {
        let mut snapshots = self.snapshots.write().map_err(|_| poisoned())?;

        if let Some(existing) = snapshots.get(candidate.id()) {
            return Self::restore(existing);
        }

        let snapshot = Snapshot {
            version: 1,
            state: Self::capture(&candidate)?,
        };
        snapshots.insert(candidate.id().clone(), snapshot);

        let mut added = candidate;
        added.set_version(1);
        Ok(added)
    }

    async fn try_get(&self, id: &A::Id) -> Result<Option<A>, RepositoryError> {
        let snapshots = self.snapshots.read().map_err(|_| poisoned())?;
        snapshots.get(id).map(Self::restore).transpose()
    }

    async fn save(&self, aggregate: &mut A) -> Result<(), RepositoryError> {
        let state = Self::capture(aggregate)?;
        let expected = ExpectedVersion::of(aggregate);

        let mut snapshots = self.snapshots.write().map_err(|_| poisoned())?;
        let current = snapshots.get(aggregate.id()).map(|s| s.version);

        expected.check(current).map_err(|e| {
            RepositoryError::Concurrency(format!("{} {}: {e}", A::AGGREGATE_TYPE, aggregate.id()))
        })?;

        let next = current.unwrap_or(0) + 1;
        snapshots.insert(aggregate.id().clone(), Snapshot { version: next, state });
        aggregate.set_version(next);

        Ok(())
    }
}
