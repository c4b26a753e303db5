//! Event types for the OERHub event system.
//!
//! Provides shared event definitions and the EventBus used by the
//! preprocessing service to expose pipeline progress to observers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Pipeline progress events.
///
/// Events are broadcast via [`EventBus`]; emitting with no subscribers is
/// not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A record entered the pipeline from the broker.
    MaterialReceived {
        material_url: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A stage finished processing a record and emitted it onward.
    StageCompleted {
        stage: String,
        material_url: Option<String>,
        /// `main` or `partial`.
        stream: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A fully processed record reached the complete sink.
    MaterialComplete {
        material_url: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A record reached the partial sink.
    MaterialPartial {
        material_url: Option<String>,
        /// The failure message carried by the record, if any.
        message: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for [`PipelineEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// A bus with no subscribers silently drops the event; pipeline progress
    /// must not depend on observers being attached.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}
