//! Concept-tagging stage: annotates material text with Wikipedia concepts
//! via the external wikifier service.
//!
//! Extracted concepts are appended to `materialmetadata.wikipediaConcepts`;
//! concepts from earlier processing runs are kept. Service failure diverts
//! the record with a stage-prefixed message.

use crate::bolt::{divert, Bolt, Emission};
use crate::wikifier::ConceptAnnotator;
use async_trait::async_trait;
use oerhub_common::models::MaterialRecord;
use std::sync::Arc;

pub struct WikificationBolt {
    name: String,
    prefix: String,
    annotator: Arc<dyn ConceptAnnotator>,
}

impl WikificationBolt {
    pub fn new(name: &str, annotator: Arc<dyn ConceptAnnotator>) -> Self {
        Self {
            name: name.to_string(),
            prefix: format!("[Wikification {}]", name),
            annotator,
        }
    }
}

#[async_trait]
impl Bolt for WikificationBolt {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, mut record: MaterialRecord) -> Emission {
        let text = match record.materialmetadata.raw_text.clone() {
            Some(t) if !t.trim().is_empty() => t,
            _ => return divert(record, &self.prefix, "no material text to annotate"),
        };
        let language = record.language.clone().unwrap_or_else(|| "en".to_string());

        match self.annotator.annotate(&text, &language).await {
            Ok(concepts) => {
                tracing::debug!(
                    stage = %self.name,
                    material_url = record.url().unwrap_or("<none>"),
                    concepts = concepts.len(),
                    "annotated material text"
                );
                record
                    .materialmetadata
                    .wikipedia_concepts
                    .get_or_insert_with(Vec::new)
                    .extend(concepts);
                Emission::main(record)
            }
            Err(e) => divert(record, &self.prefix, e.to_string()),
        }
    }
}
