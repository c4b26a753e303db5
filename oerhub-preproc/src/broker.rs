//! Opaque pub/sub channel abstraction.
//!
//! The pipeline treats the message broker as an external collaborator that
//! guarantees at-least-once delivery; topic names and consumer groups are
//! configuration. [`InMemoryBus`] is the in-process implementation used by
//! the service binary and tests; a deployment-specific transport implements
//! the same trait.

use async_trait::async_trait;
use oerhub_common::Result;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex};

/// Narrow pub/sub contract required from the broker.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a document to a topic. Delivery to subscribers is
    /// at-least-once; a topic with no subscribers drops the message.
    async fn publish(&self, topic: &str, payload: Value) -> Result<()>;

    /// Subscribe to a topic, receiving every document published after the
    /// subscription is registered.
    async fn subscribe(&self, topic: &str) -> mpsc::Receiver<Value>;
}

/// Channel-backed bus for in-process wiring.
#[derive(Default)]
pub struct InMemoryBus {
    topics: Mutex<HashMap<String, Vec<mpsc::Sender<Value>>>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, topic: &str, payload: Value) -> Result<()> {
        let senders = {
            let topics = self.topics.lock().await;
            topics.get(topic).cloned().unwrap_or_default()
        };
        for sender in senders {
            // A closed receiver just means the subscriber went away.
            let _ = sender.send(payload.clone()).await;
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> mpsc::Receiver<Value> {
        let (tx, rx) = mpsc::channel(64);
        self.topics
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        rx
    }
}
