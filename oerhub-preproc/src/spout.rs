//! Pipeline entry: consumes harvested documents from the broker and feeds
//! them into the topology.
//!
//! The broker delivers at least once; downstream stages are idempotent, so
//! the spout forwards redeliveries without tracking them. Payloads that are
//! not JSON objects cannot become material records and are logged and
//! skipped.

use crate::broker::MessageBus;
use oerhub_common::events::{EventBus, PipelineEvent};
use oerhub_common::models::MaterialRecord;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub struct Spout {
    topic: String,
    group_id: String,
    bus: Arc<dyn MessageBus>,
    events: EventBus,
}

impl Spout {
    pub fn new(topic: &str, group_id: &str, bus: Arc<dyn MessageBus>, events: EventBus) -> Self {
        Self {
            topic: topic.to_string(),
            group_id: group_id.to_string(),
            bus,
            events,
        }
    }

    /// Subscribe and pump records into the topology entry queue until
    /// cancelled or the broker subscription closes.
    pub async fn run(
        self,
        input: mpsc::Sender<MaterialRecord>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let mut subscription = self.bus.subscribe(&self.topic).await;
        tracing::info!(
            topic = %self.topic,
            group_id = %self.group_id,
            "spout subscribed"
        );

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    maybe = subscription.recv() => {
                        let Some(payload) = maybe else { break };
                        let record: MaterialRecord = match serde_json::from_value(payload) {
                            Ok(r) => r,
                            Err(e) => {
                                tracing::error!(topic = %self.topic, "unparseable document: {}", e);
                                continue;
                            }
                        };
                        let delivery_id = Uuid::new_v4();
                        tracing::debug!(
                            %delivery_id,
                            material_url = record.url().unwrap_or("<none>"),
                            "received document"
                        );
                        self.events.emit(PipelineEvent::MaterialReceived {
                            material_url: record.url().map(String::from),
                            timestamp: chrono::Utc::now(),
                        });
                        if input.send(record).await.is_err() {
                            tracing::warn!("topology entry queue closed; spout stopping");
                            break;
                        }
                    }
                }
            }
            tracing::info!(topic = %self.topic, "spout stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBus;
    use serde_json::json;

    #[tokio::test]
    async fn forwards_documents_and_skips_garbage() {
        let bus = Arc::new(InMemoryBus::new());
        let events = EventBus::new(8);
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let spout = Spout::new("PROCESSING.MATERIAL.TEXT", "g-1", bus.clone(), events);
        let handle = spout.run(tx, cancel.clone()).await;

        bus.publish("PROCESSING.MATERIAL.TEXT", json!("not an object"))
            .await
            .unwrap();
        bus.publish(
            "PROCESSING.MATERIAL.TEXT",
            json!({"materialurl": "https://example.org/m/1"}),
        )
        .await
        .unwrap();

        let record = rx.recv().await.unwrap();
        assert_eq!(record.url(), Some("https://example.org/m/1"));

        cancel.cancel();
        handle.await.unwrap();
    }
}
