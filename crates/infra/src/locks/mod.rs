//! Address lock store.
//!
//! Locks are keyed by `(blockchain type, address, direction)` and come in two
//! kinds:
//!
//! - **exclusive**: one owner at a time
//! - **concurrent**: any number of owners; while one exists no new exclusive
//!   lock is granted on the same key
//!
//! Every operation is idempotent per owner so a redelivered command can
//! repeat a partially completed acquisition or release.

mod in_memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use txexec_core::TransactionId;
use txexec_execution::{Address, BlockchainType};

pub use in_memory::InMemoryAddressLockStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockDirection {
    /// The address spends funds.
    Input,
    /// The address receives funds.
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AddressLockKey {
    pub blockchain_type: BlockchainType,
    pub address: Address,
    pub direction: LockDirection,
}

impl AddressLockKey {
    pub fn new(
        blockchain_type: BlockchainType,
        address: Address,
        direction: LockDirection,
    ) -> Self {
        Self {
            blockchain_type,
            address,
            direction,
        }
    }

    pub fn input(blockchain_type: &BlockchainType, address: &Address) -> Self {
        Self::new(blockchain_type.clone(), address.clone(), LockDirection::Input)
    }

    pub fn output(blockchain_type: &BlockchainType, address: &Address) -> Self {
        Self::new(blockchain_type.clone(), address.clone(), LockDirection::Output)
    }
}

impl core::fmt::Display for AddressLockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}:{:?}", self.blockchain_type, self.address, self.direction)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockStoreError {
    #[error("lock store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AddressLockStore: Send + Sync {
    /// Grant the exclusive lock on `key` to `owner`.
    ///
    /// Returns `true` when `owner` holds the lock afterwards (including when
    /// it already held it). Returns `false` when another owner holds it or
    /// any concurrent lock exists on the key.
    async fn acquire_exclusive(
        &self,
        key: &AddressLockKey,
        owner: TransactionId,
    ) -> Result<bool, LockStoreError>;

    /// Register a concurrent lock of `owner` on `key`. Always granted.
    async fn acquire_concurrent(
        &self,
        key: &AddressLockKey,
        owner: TransactionId,
    ) -> Result<(), LockStoreError>;

    async fn is_exclusively_held(&self, key: &AddressLockKey) -> Result<bool, LockStoreError>;

    /// Drop the exclusive lock if `owner` still holds it.
    async fn release_exclusive(
        &self,
        key: &AddressLockKey,
        owner: TransactionId,
    ) -> Result<(), LockStoreError>;

    /// Drop the concurrent lock of `owner`, if any.
    async fn release_concurrent(
        &self,
        key: &AddressLockKey,
        owner: TransactionId,
    ) -> Result<(), LockStoreError>;
}
