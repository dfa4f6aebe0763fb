//! Event bus for note graph signals.
//!
//! Scans and rename reconciliations publish a [`GraphEvent`] when they
//! finish; UI layers subscribe instead of polling process-wide flags.
//!
//! ```text
//! NoteGraph::run_full_scan() ──┐
//!                              ├─> EventBus.publish() ─> broadcast::Sender
//! NoteGraph::rename_note() ────┘                               │
//!                                         fan-out to every live Receiver
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod topics;

/// Default channel capacity when none is configured.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Source name used by the note graph core.
pub const SOURCE_NOTEGRAPH: &str = "notegraph";

/// One published signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEvent {
    /// Unique event identifier.
    pub id: String,
    /// Publishing component (for example `notegraph`).
    pub source: String,
    /// Routing topic, see [`topics`].
    pub topic: String,
    /// Topic specific payload.
    pub payload: Value,
    /// Publication time.
    pub timestamp: DateTime<Utc>,
}

impl GraphEvent {
    /// Create a new event stamped with the current time.
    pub fn new(source: impl Into<String>, topic: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            topic: topic.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Whether this event carries the given topic.
    #[must_use]
    pub fn is(&self, topic: &str) -> bool {
        self.topic == topic
    }
}

impl std::fmt::Display for GraphEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} -> {}: {}",
            self.timestamp.format("%H:%M:%S"),
            self.source,
            self.topic,
            self.payload
        )
    }
}

/// Broadcast bus owned by a note graph engine.
///
/// Publishing never blocks and never fails; with no subscribers the event is
/// dropped. Slow receivers observe `RecvError::Lagged` once the capacity is
/// exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GraphEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    /// Create a bus; a zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publish an event. Returns how many subscribers received it.
    pub fn publish(&self, event: GraphEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Build and publish an event in one call.
    pub fn emit(&self, source: &str, topic: &str, payload: Value) -> usize {
        self.publish(GraphEvent::new(source, topic, payload))
    }

    /// Subscribe to all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.tx.subscribe()
    }

    /// Live subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
