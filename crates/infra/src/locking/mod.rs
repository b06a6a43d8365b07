//! Locking policies for the source address of a transaction.
//!
//! The transaction saga is written once against [`LockingPolicy`]; the
//! policy decides which address locks an attempt holds between
//! `LockSourceAddress` and `ReleaseSourceAddressLock`, and which state table
//! the attempt runs through.

mod exclusive;
mod simple;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use txexec_core::{SwitcherBuildError, TransactionId};
use txexec_execution::{
    Address, BlockchainType, LockingMode, TransactionOutput, TransactionSwitcher,
};

use crate::config::{ConfigError, ExecutorSettings};
use crate::locks::{AddressLockStore, LockStoreError};

pub use exclusive::ExclusiveLockingPolicy;
pub use simple::SimpleLockingPolicy;

/// Addresses of one attempt, as seen by a locking policy.
#[derive(Debug, Clone, Copy)]
pub struct LockRequest<'a> {
    pub transaction_id: TransactionId,
    pub blockchain_type: &'a BlockchainType,
    pub from_address: &'a Address,
    pub outputs: &'a [TransactionOutput],
}

#[async_trait]
pub trait LockingPolicy: Send + Sync {
    fn mode(&self) -> LockingMode;

    /// State table of attempts locked by this policy.
    fn transitions(&self) -> &TransactionSwitcher;

    /// Take every lock of the attempt. `false` means another attempt holds a
    /// conflicting lock; the whole acquisition is retried later.
    async fn acquire(&self, request: LockRequest<'_>) -> Result<bool, LockStoreError>;

    /// Release every lock the attempt may hold.
    async fn release(&self, request: LockRequest<'_>) -> Result<(), LockStoreError>;
}

#[derive(Debug, Error)]
pub enum LockingSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Table(#[from] SwitcherBuildError),
}

/// Locking policy per blockchain; chains without settings use simple locking.
pub struct LockingPolicies {
    by_blockchain: HashMap<BlockchainType, Arc<dyn LockingPolicy>>,
    default: Arc<dyn LockingPolicy>,
}

impl LockingPolicies {
    pub fn new(default: Arc<dyn LockingPolicy>) -> Self {
        Self {
            by_blockchain: HashMap::new(),
            default,
        }
    }

    pub fn with_policy(
        mut self,
        blockchain_type: BlockchainType,
        policy: Arc<dyn LockingPolicy>,
    ) -> Self {
        self.by_blockchain.insert(blockchain_type, policy);
        self
    }

    pub fn from_settings(
        settings: &ExecutorSettings,
        store: Arc<dyn AddressLockStore>,
    ) -> Result<Self, LockingSetupError> {
        settings.validate()?;

        let simple: Arc<dyn LockingPolicy> = Arc::new(SimpleLockingPolicy::new(store.clone())?);
        let mut policies = Self::new(simple.clone());

        for chain in &settings.blockchains {
            let hot_wallet = &chain.hot_wallet_address;
            let policy: Arc<dyn LockingPolicy> = match (chain.locking_mode(), hot_wallet) {
                (LockingMode::Simple, _) => simple.clone(),
                (LockingMode::Exclusive, Some(hot_wallet)) => {
                    Arc::new(ExclusiveLockingPolicy::new(store.clone(), hot_wallet.clone())?)
                }
                (LockingMode::Exclusive, None) => {
                    return Err(ConfigError::MissingHotWallet(chain.blockchain_type.clone()).into());
                }
            };
            policies.by_blockchain.insert(chain.blockchain_type.clone(), policy);
        }

        Ok(policies)
    }

    pub fn for_blockchain(&self, blockchain_type: &BlockchainType) -> &Arc<dyn LockingPolicy> {
        self.by_blockchain.get(blockchain_type).unwrap_or(&self.default)
    }
}

impl core::fmt::Debug for LockingPolicies {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let modes: HashMap<&BlockchainType, LockingMode> = self
            .by_blockchain
            .iter()
            .map(|(chain, policy)| (chain, policy.mode()))
            .collect();
        f.debug_struct("LockingPolicies")
            .field("by_blockchain", &modes)
            .field("default", &self.default.mode())
            .finish()
    }
}
