//! Executor configuration.
//!
//! Settings are plain serde structs with defaults for every field, so a
//! partial JSON document is enough. Loading is the only place that uses
//! `anyhow`: a bad configuration stops the process at startup.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use txexec_execution::{Address, BlockchainType, LockingMode};

/// Environment variable holding the settings file path.
pub const SETTINGS_PATH_ENV: &str = "TXEXEC_SETTINGS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("blockchain type must not be empty")]
    EmptyBlockchainType,

    #[error("blockchain {0} is configured more than once")]
    DuplicateBlockchain(BlockchainType),

    #[error("blockchain {0} requires exclusive withdrawals but has no hot wallet address")]
    MissingHotWallet(BlockchainType),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Per-blockchain locking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainSettings {
    pub blockchain_type: BlockchainType,
    #[serde(default)]
    pub exclusive_withdrawals_required: bool,
    #[serde(default)]
    pub hot_wallet_address: Option<Address>,
}

impl BlockchainSettings {
    pub fn locking_mode(&self) -> LockingMode {
        if self.exclusive_withdrawals_required {
            LockingMode::Exclusive
        } else {
            LockingMode::Simple
        }
    }
}

/// Redelivery delays in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryDelays {
    /// Source address is locked by another transaction.
    pub address_lock_contention: u64,
    /// Source address balance does not cover the transfer yet.
    pub not_enough_balance: u64,
    /// Poll interval while waiting for the transaction to settle on chain.
    pub waiting_for_ending: u64,
    /// Fixed delay after an unexpected event (state table defect).
    pub unexpected_event: u64,
    /// Any other handler failure.
    pub default_failure: u64,
}

impl Default for RetryDelays {
    fn default() -> Self {
        Self {
            address_lock_contention: 1_000,
            not_enough_balance: 60_000,
            waiting_for_ending: 10_000,
            unexpected_event: 1_000,
            default_failure: 5_000,
        }
    }
}

impl RetryDelays {
    pub fn address_lock_contention_delay(&self) -> Duration {
        Duration::from_millis(self.address_lock_contention)
    }

    pub fn not_enough_balance_delay(&self) -> Duration {
        Duration::from_millis(self.not_enough_balance)
    }

    pub fn waiting_for_ending_delay(&self) -> Duration {
        Duration::from_millis(self.waiting_for_ending)
    }

    pub fn unexpected_event_delay(&self) -> Duration {
        Duration::from_millis(self.unexpected_event)
    }

    pub fn default_failure_delay(&self) -> Duration {
        Duration::from_millis(self.default_failure)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub blockchains: Vec<BlockchainSettings>,
    pub retry: RetryDelays,
    /// Commands handled concurrently.
    pub max_in_flight_commands: usize,
    /// Events handled concurrently.
    pub max_in_flight_events: usize,
    /// Give up an operation after this many rebuilt attempts. Unbounded when
    /// unset.
    pub max_transaction_attempts: Option<u32>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            blockchains: Vec::new(),
            retry: RetryDelays::default(),
            max_in_flight_commands: 16,
            max_in_flight_events: 32,
            max_transaction_attempts: None,
        }
    }
}

impl ExecutorSettings {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let settings: Self =
            serde_json::from_str(json).context("failed to parse executor settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("invalid settings in {}", path.display()))
    }

    /// Load from the file named by `TXEXEC_SETTINGS`, or defaults when unset.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(std::env::var_os(SETTINGS_PATH_ENV).as_deref().map(Path::new))
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => {
                let settings = Self::default();
                settings.validate()?;
                Ok(settings)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight_commands == 0 {
            return Err(ConfigError::Zero("max_in_flight_commands"));
        }
        if self.max_in_flight_events == 0 {
            return Err(ConfigError::Zero("max_in_flight_events"));
        }
        if self.max_transaction_attempts == Some(0) {
            return Err(ConfigError::Zero("max_transaction_attempts"));
        }

        let mut seen = HashSet::new();
        for chain in &self.blockchains {
            if chain.blockchain_type.as_str().trim().is_empty() {
                return Err(ConfigError::EmptyBlockchainType);
            }
            if !seen.insert(&chain.blockchain_type) {
                return Err(ConfigError::DuplicateBlockchain(chain.blockchain_type.clone()));
            }
            if chain.exclusive_withdrawals_required && chain.hot_wallet_address.is_none() {
                return Err(ConfigError::MissingHotWallet(chain.blockchain_type.clone()));
            }
        }

        Ok(())
    }

    pub fn blockchain(&self, blockchain_type: &BlockchainType) -> Option<&BlockchainSettings> {
        self.blockchains
            .iter()
            .find(|c| &c.blockchain_type == blockchain_type)
    }
}
