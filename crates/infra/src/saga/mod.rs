//! Sagas driving the two workflow aggregates.
//!
//! Each saga runs in its own event worker: a failed reaction is redelivered
//! to that saga only, so a reaction already persisted by the other saga is
//! never repeated and its commands are never lost.

mod operation;
mod transaction;

pub use operation::OperationExecutionSaga;
pub use transaction::TransactionExecutionSaga;

use tracing::debug;

use txexec_core::UnexpectedEventError;
use txexec_events::{Event, HandlingError};
use txexec_execution::ExecutorEvent;

/// Log the outcome of a switch and turn a rejection into a defect.
fn switched(
    saga_type: &'static str,
    event: &ExecutorEvent,
    result: Result<bool, UnexpectedEventError>,
) -> Result<bool, HandlingError> {
    let applied = result?;
    if applied {
        debug!(saga = saga_type, event_type = event.event_type(), "transition applied");
    } else {
        debug!(saga = saga_type, event_type = event.event_type(), "replayed event ignored");
    }
    Ok(applied)
}
