use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A fact reported by a handler or a caller.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - delivered **at least once** and possibly out of order
/// - timestamped with business time, which aggregates copy into their
///   phase timestamps
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "transaction.built").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Id that correlates every message of one workflow (the operation id).
    fn correlation_id(&self) -> Uuid;
}
