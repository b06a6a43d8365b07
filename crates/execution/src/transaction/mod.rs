//! Transaction execution: one concrete attempt to move funds.

mod aggregate;
mod state;
mod transitions;

pub use aggregate::{TransactionExecution, TransactionTimestamps};
pub use state::{TransactionExecutionResult, TransactionExecutionState};
pub use transitions::{TransactionSwitcher, transaction_transitions};

#[cfg(test)]
mod tests;
