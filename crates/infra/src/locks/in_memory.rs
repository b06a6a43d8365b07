use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use txexec_core::TransactionId;

use super::{AddressLockKey, AddressLockStore, LockStoreError};

#[derive(Debug, Default)]
struct LockRows {
    exclusive: HashMap<AddressLockKey, TransactionId>,
    concurrent: HashMap<AddressLockKey, HashSet<TransactionId>>,
}

/// In-memory lock store; each operation runs under one mutex.
#[derive(Debug, Default)]
pub struct InMemoryAddressLockStore {
    rows: Mutex<LockRows>,
}

impl InMemoryAddressLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current exclusive owner of `key`.
    pub fn exclusive_owner(&self, key: &AddressLockKey) -> Option<TransactionId> {
        self.rows.lock().ok()?.exclusive.get(key).copied()
    }

    /// Number of concurrent owners on `key`.
    pub fn concurrent_count(&self, key: &AddressLockKey) -> usize {
        self.rows
            .lock()
            .ok()
            .and_then(|rows| rows.concurrent.get(key).map(HashSet::len))
            .unwrap_or(0)
    }

    /// Total number of lock rows of both kinds.
    pub fn row_count(&self) -> usize {
        self.rows
            .lock()
            .map(|rows| {
                let concurrent: usize = rows.concurrent.values().map(HashSet::len).sum();
                rows.exclusive.len() + concurrent
            })
            .unwrap_or(0)
    }

    fn with_rows<T>(&self, f: impl FnOnce(&mut LockRows) -> T) -> Result<T, LockStoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| LockStoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(f(&mut rows))
    }
}

#[async_trait]
impl AddressLockStore for InMemoryAddressLockStore {
    async fn acquire_exclusive(
        &self,
        key: &AddressLockKey,
        owner: TransactionId,
    ) -> Result<bool, LockStoreError> {
        self.with_rows(|rows| {
            if let Some(current) = rows.exclusive.get(key) {
                return *current == owner;
            }
            if rows.concurrent.get(key).is_some_and(|owners| !owners.is_empty()) {
                return false;
            }
            rows.exclusive.insert(key.clone(), owner);
            true
        })
    }

    async fn acquire_concurrent(
        &self,
        key: &AddressLockKey,
        owner: TransactionId,
    ) -> Result<(), LockStoreError> {
        self.with_rows(|rows| {
            rows.concurrent.entry(key.clone()).or_default().insert(owner);
        })
    }

    async fn is_exclusively_held(&self, key: &AddressLockKey) -> Result<bool, LockStoreError> {
        self.with_rows(|rows| rows.exclusive.contains_key(key))
    }

    async fn release_exclusive(
        &self,
        key: &AddressLockKey,
        owner: TransactionId,
    ) -> Result<(), LockStoreError> {
        self.with_rows(|rows| {
            if rows.exclusive.get(key) == Some(&owner) {
                rows.exclusive.remove(key);
            }
        })
    }

    async fn release_concurrent(
        &self,
        key: &AddressLockKey,
        owner: TransactionId,
    ) -> Result<(), LockStoreError> {
        self.with_rows(|rows| {
            if let Some(owners) = rows.concurrent.get_mut(key) {
                owners.remove(&owner);
                if owners.is_empty() {
                    rows.concurrent.remove(key);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use txexec_execution::{Address, BlockchainType};

    use super::*;

    fn key() -> AddressLockKey {
        AddressLockKey::input(&BlockchainType::new("Bitcoin"), &Address::new("source"))
    }

    #[tokio::test]
    async fn exclusive_acquire_is_idempotent_per_owner() {
        let store = InMemoryAddressLockStore::new();
        let owner = TransactionId::new();

        assert!(store.acquire_exclusive(&key(), owner).await.unwrap());
        assert!(store.acquire_exclusive(&key(), owner).await.unwrap());

        assert_eq!(store.exclusive_owner(&key()), Some(owner));
        assert_eq!(store.row_count(), 1);
    }

    #[tokio::test]
    async fn exclusive_acquire_fails_for_another_owner() {
        let store = InMemoryAddressLockStore::new();
        let holder = TransactionId::new();

        assert!(store.acquire_exclusive(&key(), holder).await.unwrap());
        assert!(!store.acquire_exclusive(&key(), TransactionId::new()).await.unwrap());
        assert_eq!(store.exclusive_owner(&key()), Some(holder));
    }

    #[tokio::test]
    async fn concurrent_lock_blocks_new_exclusive_grants() {
        let store = InMemoryAddressLockStore::new();
        let reader = TransactionId::new();

        store.acquire_concurrent(&key(), reader).await.unwrap();
        assert!(!store.acquire_exclusive(&key(), TransactionId::new()).await.unwrap());

        store.release_concurrent(&key(), reader).await.unwrap();
        assert!(store.acquire_exclusive(&key(), TransactionId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_lock_is_granted_over_an_exclusive_one() {
        let store = InMemoryAddressLockStore::new();

        assert!(store.acquire_exclusive(&key(), TransactionId::new()).await.unwrap());
        store.acquire_concurrent(&key(), TransactionId::new()).await.unwrap();

        assert!(store.is_exclusively_held(&key()).await.unwrap());
        assert_eq!(store.concurrent_count(&key()), 1);
    }

    #[tokio::test]
    async fn release_by_a_foreign_owner_keeps_the_lock() {
        let store = InMemoryAddressLockStore::new();
        let holder = TransactionId::new();
        store.acquire_exclusive(&key(), holder).await.unwrap();

        store.release_exclusive(&key(), TransactionId::new()).await.unwrap();
        assert_eq!(store.exclusive_owner(&key()), Some(holder));

        store.release_exclusive(&key(), holder).await.unwrap();
        store.release_exclusive(&key(), holder).await.unwrap();
        assert!(!store.is_exclusively_held(&key()).await.unwrap());
    }

    #[derive(Debug, Clone)]
    enum Op {
        AcquireExclusive(usize),
        AcquireConcurrent(usize),
        ReleaseExclusive(usize),
        ReleaseConcurrent(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..3usize).prop_map(Op::AcquireExclusive),
            (0..3usize).prop_map(Op::AcquireConcurrent),
            (0..3usize).prop_map(Op::ReleaseExclusive),
            (0..3usize).prop_map(Op::ReleaseConcurrent),
        ]
    }

    proptest! {
        #[test]
        fn exclusive_grant_never_coexists_with_a_concurrent_lock_taken_before(
            ops in prop::collection::vec(op(), 1..40)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let owners = [TransactionId::new(), TransactionId::new(), TransactionId::new()];
            let store = InMemoryAddressLockStore::new();

            runtime.block_on(async {
                for op in ops {
                    match op {
                        Op::AcquireExclusive(i) => {
                            let had_concurrent = store.concurrent_count(&key()) > 0;
                            let holder = store.exclusive_owner(&key());
                            let granted = store.acquire_exclusive(&key(), owners[i]).await.unwrap();

                            match holder {
                                Some(h) => prop_assert_eq!(granted, h == owners[i]),
                                None => prop_assert_eq!(granted, !had_concurrent),
                            }
                            if granted {
                                prop_assert_eq!(store.exclusive_owner(&key()), Some(owners[i]));
                            }
                        }
                        Op::AcquireConcurrent(i) => {
                            store.acquire_concurrent(&key(), owners[i]).await.unwrap()
                        }
                        Op::ReleaseExclusive(i) => {
                            store.release_exclusive(&key(), owners[i]).await.unwrap()
                        }
                        Op::ReleaseConcurrent(i) => {
                            store.release_concurrent(&key(), owners[i]).await.unwrap()
                        }
                    }
                }
                Ok(())
            })?;
        }
    }
}
