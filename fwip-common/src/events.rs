//! Event types for the FWIP event system
//!
//! Provides the shared event enum and `EventBus` used to notify UI and
//! rule-management collaborators. Delivery is fire-and-forget: the core
//! never blocks on, or fails because of, a notification.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Engine event types
///
/// Events are broadcast via [`EventBus`] and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// A document was routed to a processing path
    DocumentRouted {
        /// Document that was routed
        document_id: Uuid,
        /// Routing path name (AUTO_APPROVE, QUICK_REVIEW, FULL_REVIEW, MANUAL_REQUIRED)
        path: String,
        /// Aggregate document confidence at decision time
        confidence: f64,
        /// When the decision was made
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A correction cluster reached the promotion threshold and became a
    /// rule-upgrade candidate
    ///
    /// Triggers:
    /// - Suggestion UI: surface the candidate for human review
    PatternPromoted {
        /// Pattern row that was promoted
        pattern_id: Uuid,
        /// Forwarder the pattern is scoped to
        forwarder_id: Uuid,
        /// Field the pattern corrects
        field_name: String,
        /// Occurrence count at promotion time
        occurrence_count: i64,
        /// When promotion happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A mapping rule version was activated
    RuleActivated {
        /// Rule identity
        rule_id: Uuid,
        /// Newly current version
        version: i64,
        /// When activation happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An automatic rollback restored a previous rule version
    ///
    /// Triggers:
    /// - Rule-management UI: review the regression
    RollbackExecuted {
        /// Rule identity
        rule_id: Uuid,
        /// Version the rule regressed on
        from_version: i64,
        /// New version carrying the restored content
        to_version: i64,
        /// Accuracy of the regressed version
        accuracy_before: f64,
        /// Accuracy of the restored version's content
        accuracy_after: f64,
        /// When the rollback committed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An automatic rollback could not be executed; the rule remains on its
    /// degraded version and self-healing has failed
    RollbackFailed {
        /// Rule identity
        rule_id: Uuid,
        /// Version the rule is stuck on
        version: i64,
        /// Failure description
        reason: String,
        /// When the failure occurred
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Event bus for broadcasting engine events
///
/// Wraps `tokio::sync::broadcast`. Subscribers receive events emitted after
/// they subscribe; slow subscribers lag and drop rather than block emitters.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, returning how many subscribers received it
    pub fn emit(
        &self,
        event: EngineEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<EngineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    ///
    /// Notification is best-effort everywhere in the engine; a missing
    /// subscriber must never fail the operation that emitted.
    pub fn emit_lossy(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let document_id = Uuid::new_v4();
        bus.emit_lossy(EngineEvent::DocumentRouted {
            document_id,
            path: "QUICK_REVIEW".to_string(),
            confidence: 82.0,
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            EngineEvent::DocumentRouted { document_id: id, path, .. } => {
                assert_eq!(id, document_id);
                assert_eq!(path, "QUICK_REVIEW");
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_lossy_without_subscribers() {
        let bus = EventBus::new(4);
        // Must not panic or error with zero subscribers
        bus.emit_lossy(EngineEvent::RollbackFailed {
            rule_id: Uuid::new_v4(),
            version: 3,
            reason: "storage unavailable".to_string(),
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = EngineEvent::RuleActivated {
            rule_id: Uuid::new_v4(),
            version: 2,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RuleActivated");
        assert_eq!(json["version"], 2);
    }
}
