use uuid::Uuid;

/// A request to perform exactly one step of a workflow.
///
/// Commands are **transient**: they are delivered at least once to a handler,
/// which performs a single side effect and reports the outcome as an event.
/// A command may be redelivered (after a retry delay or a crash), so handling
/// it twice must not produce two different outcomes.
///
/// Commands must be cloneable (retries, redelivery) and own all their data so
/// they can cross task boundaries.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable command name (e.g. "transaction.build").
    fn command_type(&self) -> &'static str;

    /// Id that correlates every message of one workflow (the operation id).
    fn correlation_id(&self) -> Uuid;
}
