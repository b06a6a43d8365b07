//! Operation execution: the caller-visible transfer, spanning one or more
//! transaction attempts.

mod aggregate;
mod state;
mod transitions;

pub use aggregate::OperationExecution;
pub use state::{OperationExecutionResult, OperationExecutionState};
pub use transitions::{OperationSwitcher, operation_transitions};
