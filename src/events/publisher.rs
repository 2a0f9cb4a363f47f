use serde_json::{json, Value};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Broadcast publisher for engagement lifecycle events. Downstream sinks
/// (dashboard feeds, audit logs) subscribe; publishing with no subscribers
/// is not an error.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event with the given name and context
    pub fn publish(&self, event_name: impl Into<String>, context: Value) {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };
        // A send error only means there are no subscribers right now
        let _ = self.sender.send(event);
    }

    /// Publish a lead lifecycle event with the lead id folded into context
    pub fn publish_lead_event(&self, event_name: &str, lead_id: Uuid, mut context: Value) {
        if let Value::Object(ref mut map) = context {
            map.insert("lead_id".to_string(), json!(lead_id));
        }
        self.publish(event_name, context);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event channel is closed")]
    ChannelClosed,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000) // Default capacity of 1000 events
    }
}
