//! Infrastructure layer: stores, locking, command handlers, sagas, workers,
//! configuration.

pub mod active_transactions;
pub mod adapters;
pub mod command_dispatcher;
pub mod config;
pub mod handlers;
pub mod locking;
pub mod locks;
pub mod repository;
pub mod runtime;
pub mod saga;
pub mod workers;


pub use config::{BlockchainSettings, ConfigError, ExecutorSettings, RetryDelays};
pub use runtime::{ExecutorDependencies, ExecutorRuntime, RuntimeError, RuntimeStats};
