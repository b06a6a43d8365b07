//! External collaborators: the blockchain adapter and the asset catalog.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use txexec_core::TransactionId;
use txexec_execution::{
    Address, AssetId, BlockchainAssetId, BlockchainType, BroadcastOutcome, BuildOutcome,
    TransactionEnding, TransactionOutput,
};

/// Failure to reach or use a blockchain adapter. Always retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("no adapter for blockchain {0}")]
    UnsupportedBlockchain(BlockchainType),

    #[error("adapter unavailable: {0}")]
    Unavailable(String),
}

/// Build request for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest<'a> {
    pub transaction_id: TransactionId,
    pub blockchain_type: &'a BlockchainType,
    pub blockchain_asset_id: &'a BlockchainAssetId,
    pub from_address: &'a Address,
    pub outputs: &'a [TransactionOutput],
    pub include_fee: bool,
}

#[async_trait]
pub trait BlockchainAdapter: Send + Sync {
    /// Build an unsigned transaction. A single output uses the single-output
    /// build, several outputs the multi-output one.
    async fn build(&self, request: BuildRequest<'_>) -> Result<BuildOutcome, AdapterError>;

    /// Sign a built transaction. Returns the signed payload.
    async fn sign(
        &self,
        blockchain_type: &BlockchainType,
        signer_address: &Address,
        transaction_context: &str,
    ) -> Result<String, AdapterError>;

    async fn broadcast(
        &self,
        transaction_id: TransactionId,
        blockchain_type: &BlockchainType,
        signed_transaction: &str,
    ) -> Result<BroadcastOutcome, AdapterError>;

    async fn query_broadcasted(
        &self,
        transaction_id: TransactionId,
        blockchain_type: &BlockchainType,
        blockchain_asset_id: &BlockchainAssetId,
    ) -> Result<TransactionEnding, AdapterError>;

    /// Drop the adapter's record of a broadcasted transaction. Idempotent.
    async fn forget_broadcasted(
        &self,
        transaction_id: TransactionId,
        blockchain_type: &BlockchainType,
    ) -> Result<(), AdapterError>;
}

/// Network-level identity of a caller asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetInfo {
    pub blockchain_type: BlockchainType,
    pub blockchain_asset_id: BlockchainAssetId,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetLookupError {
    #[error("asset {0} is not known")]
    UnknownAsset(AssetId),

    #[error("asset lookup unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AssetLookup: Send + Sync {
    async fn resolve(&self, asset_id: &AssetId) -> Result<AssetInfo, AssetLookupError>;
}

/// Fixed asset catalog.
#[derive(Debug, Default)]
pub struct InMemoryAssetCatalog {
    assets: RwLock<HashMap<AssetId, AssetInfo>>,
}

impl InMemoryAssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(
        self,
        asset_id: impl Into<AssetId>,
        blockchain_type: impl Into<BlockchainType>,
        blockchain_asset_id: impl Into<BlockchainAssetId>,
    ) -> Self {
        self.insert(asset_id, blockchain_type, blockchain_asset_id);
        self
    }

    pub fn insert(
        &self,
        asset_id: impl Into<AssetId>,
        blockchain_type: impl Into<BlockchainType>,
        blockchain_asset_id: impl Into<BlockchainAssetId>,
    ) {
        if let Ok(mut assets) = self.assets.write() {
            assets.insert(
                asset_id.into(),
                AssetInfo {
                    blockchain_type: blockchain_type.into(),
                    blockchain_asset_id: blockchain_asset_id.into(),
                },
            );
        }
    }
}

#[async_trait]
impl AssetLookup for InMemoryAssetCatalog {
    async fn resolve(&self, asset_id: &AssetId) -> Result<AssetInfo, AssetLookupError> {
        let assets = self
            .assets
            .read()
            .map_err(|_| AssetLookupError::Unavailable("lock poisoned".to_string()))?;

        assets
            .get(asset_id)
            .cloned()
            .ok_or_else(|| AssetLookupError::UnknownAsset(asset_id.clone()))
    }
}
