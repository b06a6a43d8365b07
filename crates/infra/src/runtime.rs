//! Wiring of buses, stores, handlers, sagas and workers into one executor.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use txexec_core::SwitcherBuildError;
use txexec_events::{
    Envelope, InMemoryBusError, InMemoryMessageBus, MessageBus, Subscription,
};
use txexec_execution::{ExecutorCommand, ExecutorEvent, OperationExecution, TransactionExecution};

use crate::active_transactions::{ActiveTransactionIdStore, InMemoryActiveTransactionIdStore};
use crate::adapters::{AssetLookup, BlockchainAdapter};
use crate::command_dispatcher::CommandDispatcher;
use crate::config::ExecutorSettings;
use crate::handlers::{OperationCommandHandler, TransactionCommandHandler};
use crate::locking::{LockingPolicies, LockingSetupError};
use crate::locks::{AddressLockStore, InMemoryAddressLockStore};
use crate::repository::{AggregateRepository, InMemoryAggregateRepository};
use crate::saga::{OperationExecutionSaga, TransactionExecutionSaga};
use crate::workers::{
    CommandConsumer, MessageWorker, SagaConsumer, WorkerHandle, WorkerOptions, WorkerStats,
};

pub type CommandBus = InMemoryMessageBus<Envelope<ExecutorCommand>>;
pub type EventBus = InMemoryMessageBus<Envelope<ExecutorEvent>>;

/// Stores and collaborators the executor runs against.
#[derive(Clone)]
pub struct ExecutorDependencies {
    pub adapter: Arc<dyn BlockchainAdapter>,
    pub assets: Arc<dyn AssetLookup>,
    pub lock_store: Arc<dyn AddressLockStore>,
    pub transactions: Arc<dyn AggregateRepository<TransactionExecution>>,
    pub operations: Arc<dyn AggregateRepository<OperationExecution>>,
    pub active_transactions: Arc<dyn ActiveTransactionIdStore>,
}

impl ExecutorDependencies {
    /// In-memory stores around the given collaborators.
    pub fn in_memory(adapter: Arc<dyn BlockchainAdapter>, assets: Arc<dyn AssetLookup>) -> Self {
        Self {
            adapter,
            assets,
            lock_store: Arc::new(InMemoryAddressLockStore::new()),
            transactions: Arc::new(InMemoryAggregateRepository::new()),
            operations: Arc::new(InMemoryAggregateRepository::new()),
            active_transactions: Arc::new(InMemoryActiveTransactionIdStore::new()),
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Locking(#[from] LockingSetupError),

    #[error(transparent)]
    Table(#[from] SwitcherBuildError),
}

/// Statistics of the three workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStats {
    pub commands: WorkerStats,
    pub transaction_saga: WorkerStats,
    pub operation_saga: WorkerStats,
}

/// A running executor.
///
/// Callers submit commands and observe caller-facing events on the event
/// bus. Any workflow command may be submitted, which is how an operator
/// replays a step by hand.
pub struct ExecutorRuntime {
    commands: Arc<CommandBus>,
    events: Arc<EventBus>,
    command_worker: WorkerHandle,
    transaction_saga_worker: WorkerHandle,
    operation_saga_worker: WorkerHandle,
}

impl ExecutorRuntime {
    /// Start the workers on the current tokio runtime.
    pub fn start(
        settings: &ExecutorSettings,
        deps: ExecutorDependencies,
    ) -> Result<Self, RuntimeError> {
        let policies = Arc::new(LockingPolicies::from_settings(
            settings,
            deps.lock_store.clone(),
        )?);
        let commands = Arc::new(CommandBus::new());
        let events = Arc::new(EventBus::new());

        let dispatcher = CommandDispatcher::new(
            OperationCommandHandler::new(deps.assets.clone(), deps.active_transactions.clone()),
            TransactionCommandHandler::new(
                policies.clone(),
                deps.adapter.clone(),
                deps.operations.clone(),
                settings.retry.clone(),
            ),
        );
        let transaction_saga = TransactionExecutionSaga::new(policies, deps.transactions.clone());
        let operation_saga = OperationExecutionSaga::new(
            deps.operations.clone(),
            settings.max_transaction_attempts,
        )?;

        let options = |name: &'static str, max_in_flight: usize| WorkerOptions {
            name,
            max_in_flight,
            unexpected_event_delay: settings.retry.unexpected_event_delay(),
            default_failure_delay: settings.retry.default_failure_delay(),
        };

        let command_worker = MessageWorker::spawn(
            Arc::new(CommandConsumer(dispatcher)),
            commands.as_ref(),
            events.clone(),
            options("commands", settings.max_in_flight_commands),
        );
        let transaction_saga_worker = MessageWorker::spawn(
            Arc::new(SagaConsumer(transaction_saga)),
            events.as_ref(),
            commands.clone(),
            options("transaction-saga", settings.max_in_flight_events),
        );
        let operation_saga_worker = MessageWorker::spawn(
            Arc::new(SagaConsumer(operation_saga)),
            events.as_ref(),
            commands.clone(),
            options("operation-saga", settings.max_in_flight_events),
        );

        info!(
            blockchains = settings.blockchains.len(),
            max_transaction_attempts = ?settings.max_transaction_attempts,
            "executor started"
        );

        Ok(Self {
            commands,
            events,
            command_worker,
            transaction_saga_worker,
            operation_saga_worker,
        })
    }

    pub fn submit(&self, command: impl Into<ExecutorCommand>) -> Result<(), InMemoryBusError> {
        let command = command.into();
        self.commands
            .publish(Envelope::new(*command.operation_id().as_uuid(), command))
    }

    /// Every event published from now on, caller-facing or not.
    pub fn subscribe_events(&self) -> Subscription<Envelope<ExecutorEvent>> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            commands: self.command_worker.stats(),
            transaction_saga: self.transaction_saga_worker.stats(),
            operation_saga: self.operation_saga_worker.stats(),
        }
    }

    pub async fn shutdown(self) {
        self.command_worker.shutdown().await;
        self.transaction_saga_worker.shutdown().await;
        self.operation_saga_worker.shutdown().await;
        info!("executor stopped");
    }
}
