use std::sync::Arc;

use async_trait::async_trait;

use txexec_core::SwitcherBuildError;
use txexec_execution::{Address, LockingMode, TransactionSwitcher, transaction_transitions};

use crate::locks::{AddressLockKey, AddressLockStore, LockStoreError};

use super::{LockRequest, LockingPolicy};

/// Exclusive source locks plus concurrent locks on the hot wallet.
///
/// The source address is locked exclusively in both directions. A transfer
/// into the hot wallet registers concurrent locks on it, which keeps
/// withdrawals from the hot wallet out while deposits are in flight, and
/// waits while a withdrawal holds the hot wallet's input lock.
pub struct ExclusiveLockingPolicy {
    store: Arc<dyn AddressLockStore>,
    hot_wallet_address: Address,
    transitions: TransactionSwitcher,
}

impl ExclusiveLockingPolicy {
    pub fn new(
        store: Arc<dyn AddressLockStore>,
        hot_wallet_address: Address,
    ) -> Result<Self, SwitcherBuildError> {
        Ok(Self {
            store,
            hot_wallet_address,
            transitions: transaction_transitions(LockingMode::Exclusive)?,
        })
    }

    fn hot_wallet_outputs(&self, request: &LockRequest<'_>) -> bool {
        request
            .outputs
            .iter()
            .any(|output| output.address == self.hot_wallet_address)
    }
}

#[async_trait]
impl LockingPolicy for ExclusiveLockingPolicy {
    fn mode(&self) -> LockingMode {
        LockingMode::Exclusive
    }

    fn transitions(&self) -> &TransactionSwitcher {
        &self.transitions
    }

    async fn acquire(&self, request: LockRequest<'_>) -> Result<bool, LockStoreError> {
        let owner = request.transaction_id;
        let source_output = AddressLockKey::output(request.blockchain_type, request.from_address);
        let source_input = AddressLockKey::input(request.blockchain_type, request.from_address);

        if !self.store.acquire_exclusive(&source_output, owner).await? {
            return Ok(false);
        }
        if !self.store.acquire_exclusive(&source_input, owner).await? {
            return Ok(false);
        }

        if self.hot_wallet_outputs(&request) {
            let hot_wallet = &self.hot_wallet_address;
            let hot_output = AddressLockKey::output(request.blockchain_type, hot_wallet);
            let hot_input = AddressLockKey::input(request.blockchain_type, hot_wallet);

            if !self.store.acquire_exclusive(&source_output, owner).await? {
                return Ok(false);
            }
            self.store.acquire_concurrent(&hot_output, owner).await?;
            self.store.acquire_concurrent(&hot_input, owner).await?;

            if self.store.is_exclusively_held(&hot_input).await? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn release(&self, request: LockRequest<'_>) -> Result<(), LockStoreError> {
        let owner = request.transaction_id;
        let source_output = AddressLockKey::output(request.blockchain_type, request.from_address);
        let source_input = AddressLockKey::input(request.blockchain_type, request.from_address);

        if self.hot_wallet_outputs(&request) {
            let hot_wallet = &self.hot_wallet_address;
            let hot_output = AddressLockKey::output(request.blockchain_type, hot_wallet);
            let hot_input = AddressLockKey::input(request.blockchain_type, hot_wallet);

            self.store.release_concurrent(&hot_input, owner).await?;
            self.store.release_concurrent(&hot_output, owner).await?;
        }

        self.store.release_exclusive(&source_input, owner).await?;
        self.store.release_exclusive(&source_output, owner).await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use txexec_core::TransactionId;
    use txexec_execution::{BlockchainType, TransactionOutput};

    use crate::locks::InMemoryAddressLockStore;

    use super::*;

    struct Fixture {
        store: Arc<InMemoryAddressLockStore>,
        policy: ExclusiveLockingPolicy,
        chain: BlockchainType,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(InMemoryAddressLockStore::new());
            let policy = ExclusiveLockingPolicy::new(store.clone(), Address::new("hot")).unwrap();
            Self {
                store,
                policy,
                chain: BlockchainType::new("Ethereum"),
            }
        }

        fn request<'a>(
            &'a self,
            transaction_id: TransactionId,
            from_address: &'a Address,
            outputs: &'a [TransactionOutput],
        ) -> LockRequest<'a> {
            LockRequest {
                transaction_id,
                blockchain_type: &self.chain,
                from_address,
                outputs,
            }
        }
    }

    #[tokio::test]
    async fn deposit_takes_concurrent_locks_on_the_hot_wallet() {
        let f = Fixture::new();
        let source = Address::new("user-1");
        let outputs = [TransactionOutput::new("hot", Decimal::ONE)];
        let tx = TransactionId::new();

        assert!(f.policy.acquire(f.request(tx, &source, &outputs)).await.unwrap());
        assert!(f.policy.acquire(f.request(tx, &source, &outputs)).await.unwrap());

        let hot_input = AddressLockKey::input(&f.chain, &Address::new("hot"));
        assert_eq!(f.store.concurrent_count(&hot_input), 1);
        assert_eq!(f.store.exclusive_owner(&AddressLockKey::input(&f.chain, &source)), Some(tx));
        assert_eq!(f.store.row_count(), 4);

        f.policy.release(f.request(tx, &source, &outputs)).await.unwrap();
        assert_eq!(f.store.row_count(), 0);
    }

    #[tokio::test]
    async fn hot_wallet_withdrawal_waits_for_deposits() {
        let f = Fixture::new();
        let depositor = Address::new("user-1");
        let hot = Address::new("hot");
        let deposit = [TransactionOutput::new("hot", Decimal::ONE)];
        let withdrawal = [TransactionOutput::new("user-2", Decimal::ONE)];
        let (deposit_tx, withdrawal_tx) = (TransactionId::new(), TransactionId::new());

        assert!(f.policy.acquire(f.request(deposit_tx, &depositor, &deposit)).await.unwrap());
        assert!(!f.policy.acquire(f.request(withdrawal_tx, &hot, &withdrawal)).await.unwrap());

        f.policy.release(f.request(deposit_tx, &depositor, &deposit)).await.unwrap();
        f.policy.release(f.request(withdrawal_tx, &hot, &withdrawal)).await.unwrap();

        assert!(f.policy.acquire(f.request(withdrawal_tx, &hot, &withdrawal)).await.unwrap());
    }

    #[tokio::test]
    async fn deposit_waits_while_the_hot_wallet_is_withdrawing() {
        let f = Fixture::new();
        let depositor = Address::new("user-1");
        let hot = Address::new("hot");
        let deposit = [TransactionOutput::new("hot", Decimal::ONE)];
        let withdrawal = [TransactionOutput::new("user-2", Decimal::ONE)];
        let (deposit_tx, withdrawal_tx) = (TransactionId::new(), TransactionId::new());

        assert!(f.policy.acquire(f.request(withdrawal_tx, &hot, &withdrawal)).await.unwrap());
        assert!(!f.policy.acquire(f.request(deposit_tx, &depositor, &deposit)).await.unwrap());

        f.policy.release(f.request(withdrawal_tx, &hot, &withdrawal)).await.unwrap();
        assert!(f.policy.acquire(f.request(deposit_tx, &depositor, &deposit)).await.unwrap());
    }

    #[tokio::test]
    async fn transfers_between_other_addresses_do_not_touch_the_hot_wallet() {
        let f = Fixture::new();
        let source = Address::new("user-1");
        let outputs = [TransactionOutput::new("user-2", Decimal::ONE)];

        let request = f.request(TransactionId::new(), &source, &outputs);
        assert!(f.policy.acquire(request).await.unwrap());
        assert_eq!(f.store.row_count(), 2);
    }
}
