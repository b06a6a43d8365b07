//! Transaction ids of operation attempts.
//!
//! The id of attempt `n` of an operation is created once and then returned
//! unchanged, so a redelivered `GenerateActiveTransactionId` reports the same
//! id as the first delivery.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use txexec_core::{OperationId, TransactionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActiveTransactionStoreError {
    #[error("active transaction store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ActiveTransactionIdStore: Send + Sync {
    async fn get_or_create(
        &self,
        operation_id: OperationId,
        transaction_number: u32,
    ) -> Result<TransactionId, ActiveTransactionStoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryActiveTransactionIdStore {
    ids: Mutex<HashMap<(OperationId, u32), TransactionId>>,
}

impl InMemoryActiveTransactionIdStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActiveTransactionIdStore for InMemoryActiveTransactionIdStore {
    async fn get_or_create(
        &self,
        operation_id: OperationId,
        transaction_number: u32,
    ) -> Result<TransactionId, ActiveTransactionStoreError> {
        let mut ids = self
            .ids
            .lock()
            .map_err(|_| ActiveTransactionStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(*ids
            .entry((operation_id, transaction_number))
            .or_insert_with(TransactionId::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_attempt_gets_the_same_id() {
        let store = InMemoryActiveTransactionIdStore::new();
        let operation_id = OperationId::new();

        let first = store.get_or_create(operation_id, 1).await.unwrap();
        let again = store.get_or_create(operation_id, 1).await.unwrap();
        let next = store.get_or_create(operation_id, 2).await.unwrap();

        assert_eq!(first, again);
        assert_ne!(first, next);
    }
}
