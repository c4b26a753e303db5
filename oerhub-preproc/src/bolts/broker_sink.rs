//! Terminal sink stages: publish finished records back onto the broker.
//!
//! Two instances exist per topology: the complete sink (subscribed to the
//! validation stage's main stream) and the partial sink (subscribed to
//! every stage's partial stream). A sink's emission is terminal — no stage
//! subscribes to its output — so records leave the pipeline here.

use crate::bolt::{Bolt, Emission};
use crate::broker::MessageBus;
use async_trait::async_trait;
use oerhub_common::events::{EventBus, PipelineEvent};
use oerhub_common::models::MaterialRecord;
use std::sync::Arc;

/// Which terminal outcome this sink represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Complete,
    Partial,
}

pub struct BrokerSinkBolt {
    name: String,
    topic: String,
    kind: SinkKind,
    bus: Arc<dyn MessageBus>,
    events: EventBus,
}

impl BrokerSinkBolt {
    pub fn new(
        name: &str,
        topic: &str,
        kind: SinkKind,
        bus: Arc<dyn MessageBus>,
        events: EventBus,
    ) -> Self {
        Self {
            name: name.to_string(),
            topic: topic.to_string(),
            kind,
            bus,
            events,
        }
    }
}

#[async_trait]
impl Bolt for BrokerSinkBolt {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, record: MaterialRecord) -> Emission {
        let material_url = record.url().map(String::from);

        match serde_json::to_value(&record) {
            Ok(payload) => {
                if let Err(e) = self.bus.publish(&self.topic, payload).await {
                    // The record still leaves the pipeline; the broker is
                    // expected to be retried by redelivery upstream.
                    tracing::error!(
                        sink = %self.name,
                        topic = %self.topic,
                        material_url = material_url.as_deref().unwrap_or("<none>"),
                        "failed to publish record: {}",
                        e
                    );
                }
            }
            Err(e) => {
                tracing::error!(sink = %self.name, "failed to serialize record: {}", e);
            }
        }

        let timestamp = chrono::Utc::now();
        match self.kind {
            SinkKind::Complete => {
                tracing::info!(
                    material_url = material_url.as_deref().unwrap_or("<none>"),
                    "material fully processed"
                );
                self.events.emit(PipelineEvent::MaterialComplete {
                    material_url,
                    timestamp,
                });
            }
            SinkKind::Partial => {
                tracing::info!(
                    material_url = material_url.as_deref().unwrap_or("<none>"),
                    message = record.message.as_deref().unwrap_or(""),
                    "material partially processed"
                );
                self.events.emit(PipelineEvent::MaterialPartial {
                    material_url,
                    message: record.message.clone(),
                    timestamp,
                });
            }
        }

        Emission::main(record)
    }
}
