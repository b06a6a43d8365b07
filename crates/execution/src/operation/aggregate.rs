use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use txexec_core::{AggregateRoot, OperationId, TransactionId};

use crate::common::{
    Address, AssetId, BlockchainAssetId, BlockchainType, CompletedTransaction,
    EndpointsConfiguration, TransactionOutput,
};
use crate::errors::{OperationExecutionError, OperationExecutionErrorCode};
use crate::events::OperationExecutionStarted;

use super::state::{OperationExecutionResult, OperationExecutionState};

/// Aggregate root: OperationExecution (the caller's transfer request).
///
/// Tracks which transaction attempt is active. Retries create a new attempt
/// with the next transaction number; only one attempt is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationExecution {
    operation_id: OperationId,

    from_address: Address,
    outputs: Vec<TransactionOutput>,
    asset_id: AssetId,
    blockchain_type: BlockchainType,
    blockchain_asset_id: BlockchainAssetId,
    include_fee: bool,
    endpoints_configuration: EndpointsConfiguration,

    state: OperationExecutionState,
    result: Option<OperationExecutionResult>,

    active_transaction_id: Option<TransactionId>,
    active_transaction_number: u32,

    completion: Option<CompletedTransaction>,
    error: Option<OperationExecutionError>,

    started_at: DateTime<Utc>,
    active_transaction_started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    notified_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    version: u64,
}

impl OperationExecution {
    pub fn start(started: &OperationExecutionStarted) -> Self {
        Self {
            operation_id: started.operation_id,
            from_address: started.from_address.clone(),
            outputs: started.outputs.clone(),
            asset_id: started.asset_id.clone(),
            blockchain_type: started.blockchain_type.clone(),
            blockchain_asset_id: started.blockchain_asset_id.clone(),
            include_fee: started.include_fee,
            endpoints_configuration: started.endpoints_configuration,
            state: OperationExecutionState::Started,
            result: None,
            active_transaction_id: None,
            active_transaction_number: 0,
            completion: None,
            error: None,
            started_at: started.occurred_at,
            active_transaction_started_at: None,
            finished_at: None,
            notified_at: None,
            version: 0,
        }
    }

    pub fn operation_id(&self) -> OperationId {
        self.operation_id
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

    pub fn endpoints_configuration(&self) -> EndpointsConfiguration {
        self.endpoints_configuration
    }

    pub fn state(&self) -> OperationExecutionState {
        self.state
    }

    pub fn result(&self) -> Option<OperationExecutionResult> {
        self.result
    }

    pub fn active_transaction_id(&self) -> Option<TransactionId> {
        self.active_transaction_id
    }

    /// 0 until the first attempt id is generated.
    pub fn active_transaction_number(&self) -> u32 {
        self.active_transaction_number
    }

    pub fn is_active_transaction(&self, transaction_id: TransactionId) -> bool {
        self.active_transaction_id == Some(transaction_id)
    }

    pub fn completion(&self) -> Option<&CompletedTransaction> {
        self.completion.as_ref()
    }

    pub fn error(&self) -> Option<&OperationExecutionError> {
        self.error.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn notified_at(&self) -> Option<DateTime<Utc>> {
        self.notified_at
    }

    pub(crate) fn on_active_transaction_id_generated(
        &mut self,
        transaction_id: TransactionId,
        transaction_number: u32,
    ) {
        self.state = OperationExecutionState::ActiveTransactionIdGenerated;
        self.active_transaction_id = Some(transaction_id);
        self.active_transaction_number = transaction_number;
    }

    pub(crate) fn on_transaction_execution_started(&mut self, at: DateTime<Utc>) {
        self.state = OperationExecutionState::TransactionExecutionInProgress;
        self.active_transaction_started_at = Some(at);
    }

    pub(crate) fn on_active_transaction_cleared(&mut self) {
        self.state = OperationExecutionState::ActiveTransactionCleared;
        self.active_transaction_started_at = None;
    }

    pub(crate) fn on_completed(&mut self, completion: CompletedTransaction, at: DateTime<Utc>) {
        self.state = OperationExecutionState::Completed;
        self.result = Some(OperationExecutionResult::Completed);
        self.completion = Some(completion);
        self.finished_at = Some(at);
    }

    pub(crate) fn on_failed(
        &mut self,
        code: OperationExecutionErrorCode,
        message: &str,
        at: DateTime<Utc>,
    ) {
        self.state = OperationExecutionState::Failed;
        self.result = Some(OperationExecutionResult::Failed);
        self.error = Some(OperationExecutionError {
            code,
            message: message.to_string(),
        });
        self.finished_at = Some(at);
    }

    pub(crate) fn on_notified_about_ending(&mut self, at: DateTime<Utc>) {
        self.state = OperationExecutionState::NotifiedAboutEnding;
        self.notified_at = Some(at);
    }
}

impl AggregateRoot for OperationExecution {
    type Id = OperationId;

    const AGGREGATE_TYPE: &'static str = "execution.operation";

    fn id(&self) -> &Self::Id {
        &self.operation_id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
