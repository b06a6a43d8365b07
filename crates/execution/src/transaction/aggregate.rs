use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use txexec_core::{AggregateRoot, DomainError, DomainResult, OperationId, TransactionId};

use crate::common::{
    Address, AssetId, BlockchainAssetId, BlockchainType, CompletedTransaction, LockingMode,
    TransactionOutput,
};
use crate::errors::{TransactionExecutionError, TransactionExecutionErrorCode};
use crate::events::{TransactionBuilt, TransactionExecutionStarted};

use super::state::{TransactionExecutionResult, TransactionExecutionState};

/// One timestamp per phase entered. Diagnostics only, never drives logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTimestamps {
    pub started_at: DateTime<Utc>,
    pub source_address_locked_at: Option<DateTime<Utc>>,
    pub built_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub broadcasted_at: Option<DateTime<Utc>>,
    pub source_address_released_at: Option<DateTime<Utc>>,
    pub waiting_for_ending_started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cleared_at: Option<DateTime<Utc>>,
}

/// Aggregate root: TransactionExecution (one build/sign/broadcast attempt).
///
/// State changes only through the transaction state table; the `on_*`
/// mutations are crate-private and each one sets exactly the fields of the
/// phase it enters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionExecution {
    operation_id: OperationId,
    transaction_id: TransactionId,
    transaction_number: u32,

    from_address: Address,
    outputs: Vec<TransactionOutput>,
    asset_id: AssetId,
    blockchain_type: BlockchainType,
    blockchain_asset_id: BlockchainAssetId,
    include_fee: bool,

    state: TransactionExecutionState,
    result: Option<TransactionExecutionResult>,

    transaction_context: Option<String>,
    source_address_context: Option<String>,
    signed_transaction: Option<String>,
    completion: Option<CompletedTransaction>,
    error: Option<TransactionExecutionError>,

    timestamps: TransactionTimestamps,

    /// Assigned by the store; not part of the snapshot.
    #[serde(skip)]
    version: u64,
}

impl TransactionExecution {
    /// Fresh aggregate in `Started` for the attempt described by `started`.
    pub fn start(started: &TransactionExecutionStarted) -> Self {
        Self {
            operation_id: started.operation_id,
            transaction_id: started.transaction_id,
            transaction_number: started.transaction_number,
            from_address: started.from_address.clone(),
            outputs: started.outputs.clone(),
            asset_id: started.asset_id.clone(),
            blockchain_type: started.blockchain_type.clone(),
            blockchain_asset_id: started.blockchain_asset_id.clone(),
            include_fee: started.include_fee,
            state: TransactionExecutionState::Started,
            result: None,
            transaction_context: None,
            source_address_context: None,
            signed_transaction: None,
            completion: None,
            error: None,
            timestamps: TransactionTimestamps {
                started_at: started.occurred_at,
                source_address_locked_at: None,
                built_at: None,
                signed_at: None,
                broadcasted_at: None,
                source_address_released_at: None,
                waiting_for_ending_started_at: None,
                finished_at: None,
                cleared_at: None,
            },
            version: 0,
        }
    }

    pub fn operation_id(&self) -> OperationId {
        self.operation_id
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn transaction_number(&self) -> u32 {
        self.transaction_number
    }

    pub fn from_address(&self) -> &Address {
        &self.from_address
    }

    pub fn outputs(&self) -> &[TransactionOutput] {
        &self.outputs
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn blockchain_type(&self) -> &BlockchainType {
        &self.blockchain_type
    }

    pub fn blockchain_asset_id(&self) -> &BlockchainAssetId {
        &self.blockchain_asset_id
    }

    pub fn include_fee(&self) -> bool {
        self.include_fee
    }

    pub fn state(&self) -> TransactionExecutionState {
        self.state
    }

    pub fn result(&self) -> Option<TransactionExecutionResult> {
        self.result
    }

    /// A failure (or repeat request) was recorded for this attempt.
    pub fn has_failed(&self) -> bool {
        self.result.is_some_and(|r| r.is_failure())
    }

    pub fn transaction_context(&self) -> Option<&str> {
        self.transaction_context.as_deref()
    }

    pub fn source_address_context(&self) -> Option<&str> {
        self.source_address_context.as_deref()
    }

    pub fn signed_transaction(&self) -> Option<&str> {
        self.signed_transaction.as_deref()
    }

    pub fn completion(&self) -> Option<&CompletedTransaction> {
        self.completion.as_ref()
    }

    pub fn error(&self) -> Option<&TransactionExecutionError> {
        self.error.as_ref()
    }

    pub fn timestamps(&self) -> &TransactionTimestamps {
        &self.timestamps
    }

    /// Check that the populated progress fields match the current state.
    pub fn check_invariants(&self) -> DomainResult<()> {
        use TransactionExecutionState as S;

        let built = matches!(
            self.state,
            S::Built | S::Signed | S::Broadcasted | S::BroadcastingFailed | S::WaitingForEnding
                | S::Completed | S::WaitingForEndingFailed
        );
        let signed = matches!(
            self.state,
            S::Signed | S::Broadcasted | S::BroadcastingFailed | S::WaitingForEnding
                | S::Completed | S::WaitingForEndingFailed
        );

        let build_contexts =
            self.transaction_context.is_some() && self.source_address_context.is_some();
        if built && !build_contexts {
            return Err(DomainError::invariant(format!(
                "{:?} requires the build contexts",
                self.state
            )));
        }
        if signed && self.signed_transaction.is_none() {
            return Err(DomainError::invariant(format!(
                "{:?} requires a signed transaction",
                self.state
            )));
        }
        let before_build = self.state == S::Started || self.state.is_locked();
        let build_output = self.transaction_context.is_some()
            || self.source_address_context.is_some()
            || self.signed_transaction.is_some();
        if before_build && build_output {
            return Err(DomainError::invariant(format!(
                "{:?} must not carry build output",
                self.state
            )));
        }
        if self.state == S::BuildingFailed && self.signed_transaction.is_some() {
            return Err(DomainError::invariant(
                "a transaction that failed to build cannot be signed",
            ));
        }
        if self.state.is_failed() && (self.error.is_none() || !self.has_failed()) {
            return Err(DomainError::invariant(format!(
                "{:?} requires a recorded failure",
                self.state
            )));
        }
        if self.state == S::Completed
            && (self.completion.is_none()
                || self.result != Some(TransactionExecutionResult::Completed))
        {
            return Err(DomainError::invariant(
                "completed transaction requires completion data",
            ));
        }

        Ok(())
    }

    pub(crate) fn on_source_address_locked(&mut self, mode: LockingMode, at: DateTime<Utc>) {
        self.state = TransactionExecutionState::locked(mode);
        self.timestamps.source_address_locked_at = Some(at);
    }

    pub(crate) fn on_built(&mut self, built: &TransactionBuilt) {
        self.state = TransactionExecutionState::Built;
        self.transaction_context = Some(built.transaction_context.clone());
        self.source_address_context = Some(built.source_address_context.clone());
        self.timestamps.built_at = Some(built.occurred_at);
    }

    pub(crate) fn on_signed(&mut self, signed_transaction: &str, at: DateTime<Utc>) {
        self.state = TransactionExecutionState::Signed;
        self.signed_transaction = Some(signed_transaction.to_string());
        self.timestamps.signed_at = Some(at);
    }

    pub(crate) fn on_broadcasted(&mut self, at: DateTime<Utc>) {
        self.state = TransactionExecutionState::Broadcasted;
        self.timestamps.broadcasted_at = Some(at);
    }

    pub(crate) fn on_source_address_released(&mut self, mode: LockingMode, at: DateTime<Utc>) {
        self.state = TransactionExecutionState::released(mode);
        self.timestamps.source_address_released_at = Some(at);
    }

    pub(crate) fn on_waiting_for_ending_started(&mut self, at: DateTime<Utc>) {
        self.state = TransactionExecutionState::WaitingForEnding;
        self.timestamps.waiting_for_ending_started_at = Some(at);
    }

    pub(crate) fn on_completed(&mut self, completion: CompletedTransaction, at: DateTime<Utc>) {
        self.state = TransactionExecutionState::Completed;
        self.result = Some(TransactionExecutionResult::Completed);
        self.completion = Some(completion);
        self.timestamps.finished_at = Some(at);
    }

    pub(crate) fn on_failed(
        &mut self,
        failed_state: TransactionExecutionState,
        result: TransactionExecutionResult,
        code: TransactionExecutionErrorCode,
        message: &str,
        at: DateTime<Utc>,
    ) {
        self.state = failed_state;
        self.result = Some(result);
        self.error = Some(TransactionExecutionError {
            code,
            message: message.to_string(),
        });
        self.timestamps.finished_at = Some(at);
    }

    pub(crate) fn on_cleared(&mut self, at: DateTime<Utc>) {
        self.state = TransactionExecutionState::Cleared;
        self.timestamps.cleared_at = Some(at);
    }
}

impl AggregateRoot for TransactionExecution {
    type Id = TransactionId;

    const AGGREGATE_TYPE: &'static str = "execution.transaction";

    fn id(&self) -> &Self::Id {
        &self.transaction_id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
