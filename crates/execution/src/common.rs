//! Value types shared by both workflows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use txexec_core::{DomainError, DomainResult, ValueObject};

macro_rules! string_value {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl ValueObject for $name {}
    };
}

string_value!(
    /// Blockchain address, compared verbatim.
    Address
);
string_value!(
    /// Caller-level asset id.
    AssetId
);
string_value!(
    /// Blockchain integration identifier (e.g. "Ethereum").
    BlockchainType
);
string_value!(
    /// Asset id as known to the blockchain integration.
    BlockchainAssetId
);

/// One destination of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub address: Address,
    pub amount: Decimal,
}

impl TransactionOutput {
    pub fn new(address: impl Into<Address>, amount: Decimal) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

impl ValueObject for TransactionOutput {}

/// Reject empty output lists and non-positive amounts.
pub fn validate_outputs(outputs: &[TransactionOutput]) -> DomainResult<()> {
    if outputs.is_empty() {
        return Err(DomainError::validation("at least one output is required"));
    }

    for (idx, output) in outputs.iter().enumerate() {
        if output.address.as_str().trim().is_empty() {
            return Err(DomainError::validation(format!(
                "output {idx} has an empty address"
            )));
        }
        if output.amount <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "output {idx} amount must be positive, got {}",
                output.amount
            )));
        }
    }

    Ok(())
}

/// Address locking protocol a blockchain uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockingMode {
    /// Single-owner lock on the source address.
    Simple,
    /// Exclusive source locks plus concurrent locks on a hot-wallet destination.
    Exclusive,
}

/// Which caller-facing completion notification an operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointsConfiguration {
    SingleDestination,
    OneToMany,
}

/// Data of a transaction observed as completed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTransaction {
    pub outputs: Vec<TransactionOutput>,
    pub fee: Decimal,
    pub block: u64,
    pub hash: String,
}
