use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transport envelope around a command or an event.
///
/// Notes:
/// - `message_id` is stable across redeliveries of the same message.
/// - `attempt` starts at 1 and is incremented each time the worker schedules
///   a redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    message_id: Uuid,
    correlation_id: Uuid,
    attempt: u32,
    published_at: DateTime<Utc>,
    payload: M,
}

impl<M> Envelope<M> {
    pub fn new(correlation_id: Uuid, payload: M) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            correlation_id,
            attempt: 1,
            published_at: Utc::now(),
            payload,
        }
    }

    /// The same message, marked as its next delivery attempt.
    pub fn redelivery(mut self) -> Self {
        self.attempt = self.attempt.saturating_add(1);
        self.published_at = Utc::now();
        self
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn payload(&self) -> &M {
        &self.payload
    }

    pub fn into_payload(self) -> M {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redelivery_keeps_identity_and_bumps_attempt() {
        let correlation = Uuid::now_v7();
        let envelope = Envelope::new(correlation, "build".to_string());
        let id = envelope.message_id();

        let again = envelope.redelivery().redelivery();

        assert_eq!(again.message_id(), id);
        assert_eq!(again.correlation_id(), correlation);
        assert_eq!(again.attempt(), 3);
        assert_eq!(again.payload(), "build");
    }

    #[test]
    fn envelope_serializes_with_payload() {
        let envelope = Envelope::new(Uuid::now_v7(), 42u32);

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["attempt"], 1);
        assert_eq!(json["payload"], 42);

        let back: Envelope<u32> = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }
}
