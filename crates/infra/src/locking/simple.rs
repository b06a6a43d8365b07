use std::sync::Arc;

use async_trait::async_trait;

use txexec_core::SwitcherBuildError;
use txexec_execution::{LockingMode, TransactionSwitcher, transaction_transitions};

use crate::locks::{AddressLockKey, AddressLockStore, LockStoreError};

use super::{LockRequest, LockingPolicy};

/// One exclusive input lock on the source address.
pub struct SimpleLockingPolicy {
    store: Arc<dyn AddressLockStore>,
    transitions: TransactionSwitcher,
}

impl SimpleLockingPolicy {
    pub fn new(store: Arc<dyn AddressLockStore>) -> Result<Self, SwitcherBuildError> {
        Ok(Self {
            store,
            transitions: transaction_transitions(LockingMode::Simple)?,
        })
    }
}

#[async_trait]
impl LockingPolicy for SimpleLockingPolicy {
    fn mode(&self) -> LockingMode {
        LockingMode::Simple
    }

    fn transitions(&self) -> &TransactionSwitcher {
        &self.transitions
    }

    async fn acquire(&self, request: LockRequest<'_>) -> Result<bool, LockStoreError> {
        let key = AddressLockKey::input(request.blockchain_type, request.from_address);
        self.store.acquire_exclusive(&key, request.transaction_id).await
    }

    async fn release(&self, request: LockRequest<'_>) -> Result<(), LockStoreError> {
        let key = AddressLockKey::input(request.blockchain_type, request.from_address);
        self.store.release_exclusive(&key, request.transaction_id).await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use txexec_core::TransactionId;
    use txexec_execution::{Address, BlockchainType, TransactionOutput};

    use crate::locks::InMemoryAddressLockStore;

    use super::*;

    #[tokio::test]
    async fn second_attempt_on_the_same_source_waits_for_release() {
        let store = Arc::new(InMemoryAddressLockStore::new());
        let policy = SimpleLockingPolicy::new(store.clone()).unwrap();
        let chain = BlockchainType::new("Bitcoin");
        let source = Address::new("source");
        let outputs = [TransactionOutput::new("dest", Decimal::ONE)];
        let request = |transaction_id| LockRequest {
            transaction_id,
            blockchain_type: &chain,
            from_address: &source,
            outputs: &outputs,
        };
        let (first, second) = (TransactionId::new(), TransactionId::new());

        assert!(policy.acquire(request(first)).await.unwrap());
        assert!(policy.acquire(request(first)).await.unwrap());
        assert!(!policy.acquire(request(second)).await.unwrap());

        policy.release(request(first)).await.unwrap();
        assert!(policy.acquire(request(second)).await.unwrap());
        assert_eq!(store.row_count(), 1);
    }
}
