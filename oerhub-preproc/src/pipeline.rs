//! Concrete wiring of the text-material preprocessing topology.
//!
//! Stage sequence: format → type → text-extraction → transcription →
//! wikification → validation → complete sink; the partial sink subscribes
//! to every stage's partial stream so a failure anywhere is captured
//! uniformly. Collaborating services are passed in, so tests wire the same
//! topology with mocks.

use crate::bolt::Stream;
use crate::bolts::{
    broker_sink::SinkKind, BrokerSinkBolt, MaterialFormatBolt, MaterialTypeBolt,
    MaterialValidatorBolt, TextExtractionBolt, TranscriptionSettings, TtpTranscriptionBolt,
    WikificationBolt,
};
use crate::broker::MessageBus;
use crate::schema::{material_schema, SchemaValidator};
use crate::store::ProcessStore;
use crate::topology::{Topology, TopologyBuilder};
use crate::ttp::TranscriptionService;
use crate::wikifier::ConceptAnnotator;
use oerhub_common::config::ServiceConfig;
use oerhub_common::events::EventBus;
use oerhub_common::Result;
use std::sync::Arc;

/// In-flight records the transcription stage may hold; its poll-waits
/// otherwise serialize all materials behind one slow job.
const TRANSCRIPTION_PARALLELISM: usize = 4;

/// External collaborators injected at topology-build time.
pub struct PipelineDeps {
    pub bus: Arc<dyn MessageBus>,
    pub transcription: Arc<dyn TranscriptionService>,
    pub annotator: Arc<dyn ConceptAnnotator>,
    pub store: Arc<dyn ProcessStore>,
    pub events: EventBus,
}

/// Build and start the preprocessing topology.
pub fn build_topology(config: &ServiceConfig, deps: PipelineDeps) -> Result<Topology> {
    let settings = TranscriptionSettings::from_config(&config.ttp)?;

    let format = Arc::new(MaterialFormatBolt::new("material-format"));
    let type_stage = Arc::new(MaterialTypeBolt::new("material-type"));
    let text = Arc::new(TextExtractionBolt::new("text-content-extraction", true));
    let transcription = Arc::new(TtpTranscriptionBolt::new(
        "text-content-translation",
        settings,
        deps.transcription,
        deps.store,
    )?);
    let wikification = Arc::new(WikificationBolt::new("wikification", deps.annotator));
    let validator = Arc::new(MaterialValidatorBolt::new(
        "material-validator",
        SchemaValidator::new(),
        material_schema(),
    ));
    let complete_sink = Arc::new(BrokerSinkBolt::new(
        "material-complete-topic",
        &config.broker.complete_topic,
        SinkKind::Complete,
        deps.bus.clone(),
        deps.events.clone(),
    ));
    let partial_sink = Arc::new(BrokerSinkBolt::new(
        "material-partial-topic",
        &config.broker.partial_topic,
        SinkKind::Partial,
        deps.bus,
        deps.events.clone(),
    ));

    let processing_stages = [
        "material-format",
        "material-type",
        "text-content-extraction",
        "text-content-translation",
        "wikification",
        "material-validator",
    ];

    let mut builder = TopologyBuilder::new(deps.events)
        .add_stage("material-format", format)
        .add_stage("material-type", type_stage)
        .add_stage("text-content-extraction", text)
        .add_stage_with_parallelism(
            "text-content-translation",
            transcription,
            TRANSCRIPTION_PARALLELISM,
        )
        .add_stage("wikification", wikification)
        .add_stage("material-validator", validator)
        .add_stage("material-complete-topic", complete_sink)
        .add_stage("material-partial-topic", partial_sink)
        .entry("material-format")
        .subscribe("material-type", "material-format", Stream::Main)
        .subscribe("text-content-extraction", "material-type", Stream::Main)
        .subscribe(
            "text-content-translation",
            "text-content-extraction",
            Stream::Main,
        )
        .subscribe("wikification", "text-content-translation", Stream::Main)
        .subscribe("material-validator", "wikification", Stream::Main)
        .subscribe("material-complete-topic", "material-validator", Stream::Main);

    // A failure at any stage is captured uniformly by the partial sink.
    for stage in processing_stages {
        builder = builder.subscribe("material-partial-topic", stage, Stream::Partial);
    }

    builder.build()
}
