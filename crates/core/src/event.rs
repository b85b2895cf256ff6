//! Domain event system: the presentation boundary.
//!
//! The engine publishes progress and error notifications here; whatever
//! renders them (a terminal, an overlay, a speech pipeline) subscribes.
//! Publishing is fire-and-forget: no subscribers, lagging subscribers, or
//! failing renderers can never affect the pipeline's control flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Pipeline stage a progress message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classifying,
    Thinking,
    Matching,
    Coding,
    Executing,
    Repairing,
    Summarizing,
}

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// Human-readable progress (`notify_progress`)
    Progress {
        stage: Stage,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Something went wrong for the current turn (`notify_error`)
    ErrorRaised {
        context: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The engine is waiting for more detail from the user
    ClarificationRequested {
        session_id: String,
        prompt: String,
        timestamp: DateTime<Utc>,
    },

    /// An execution attempt is starting
    AttemptStarted {
        unit: String,
        attempt: u32,
        max_attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// An execution attempt failed
    AttemptFailed {
        unit: String,
        attempt: u32,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A unit passed validation and was published to the library
    UnitPersisted {
        unit: String,
        timestamp: DateTime<Utc>,
    },

    /// A failed unit was removed from the library
    UnitDiscarded {
        unit: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }

    /// `notify_progress` of the presentation boundary.
    pub fn progress(&self, stage: Stage, message: impl Into<String>) {
        self.publish(DomainEvent::Progress {
            stage,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// `notify_error` of the presentation boundary.
    pub fn error(&self, context: impl Into<String>, message: impl Into<String>) {
        self.publish(DomainEvent::ErrorRaised {
            context: context.into(),
            message: message.into(),
            timestamp: Utc::now(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
