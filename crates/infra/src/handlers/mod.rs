//! Command handlers.
//!
//! Each handler method performs one side effect and reports its outcome as
//! exactly one event in the outbox, or asks for a delayed redelivery. No
//! handler decides which step comes next.

mod operation;
mod transaction;

pub use operation::OperationCommandHandler;
pub use transaction::TransactionCommandHandler;
