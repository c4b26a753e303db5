//! Validation stage: structural check of the fully processed record.
//!
//! Applies the fixed material schema. Valid records forward unchanged to
//! the main stream; invalid ones divert to the partial stream with no
//! mutation at all — a stage that produced incomplete data upstream is the
//! one responsible for the failure message, not the validator.

use crate::bolt::{Bolt, Emission};
use crate::schema::{Schema, SchemaValidator};
use async_trait::async_trait;
use oerhub_common::models::MaterialRecord;

pub struct MaterialValidatorBolt {
    name: String,
    validator: SchemaValidator,
    schema: Schema,
}

impl MaterialValidatorBolt {
    pub fn new(name: &str, validator: SchemaValidator, schema: Schema) -> Self {
        Self {
            name: name.to_string(),
            validator,
            schema,
        }
    }
}

#[async_trait]
impl Bolt for MaterialValidatorBolt {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, record: MaterialRecord) -> Emission {
        let value = match serde_json::to_value(&record) {
            Ok(v) => v,
            // A record that cannot serialize cannot be published either.
            Err(_) => return Emission::partial(record),
        };

        if self.validator.validate(&value, &self.schema) {
            Emission::main(record)
        } else {
            tracing::debug!(
                stage = %self.name,
                material_url = record.url().unwrap_or("<none>"),
                "record failed structural validation"
            );
            Emission::partial(record)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::Stream;
    use crate::schema::material_schema;
    use oerhub_common::models::{MaterialMetadata, ProviderMetadata};

    fn bolt() -> MaterialValidatorBolt {
        MaterialValidatorBolt::new("validator-1", SchemaValidator::new(), material_schema())
    }

    fn complete_record() -> MaterialRecord {
        MaterialRecord {
            title: Some("Intro to Graphs".to_string()),
            provideruri: Some("https://provider.example/materials".to_string()),
            materialurl: Some("https://provider.example/materials/graphs".to_string()),
            language: Some("en".to_string()),
            providermetadata: Some(ProviderMetadata {
                title: Some("Example U".to_string()),
                url: Some("https://provider.example".to_string()),
            }),
            materialmetadata: MaterialMetadata {
                raw_text: Some("a graph is a set of vertices and edges".to_string()),
                wikipedia_concepts: Some(vec![]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn complete_record_passes_unchanged() {
        let record = complete_record();
        let emission = bolt().process(record.clone()).await;
        assert_eq!(emission.stream, Stream::Main);
        assert_eq!(emission.record, record);
    }

    #[tokio::test]
    async fn incomplete_record_goes_partial_without_message() {
        let mut record = complete_record();
        record.materialmetadata.wikipedia_concepts = None;

        let emission = bolt().process(record.clone()).await;
        assert_eq!(emission.stream, Stream::Partial);
        // The validator itself authors no failure message.
        assert_eq!(emission.record, record);
        assert!(emission.record.message.is_none());
    }

    #[tokio::test]
    async fn upstream_failure_message_is_preserved() {
        let mut record = complete_record();
        record.materialmetadata.raw_text = None;
        record.message = Some("[TextExtraction text-1] unable to extract text".to_string());

        let emission = bolt().process(record).await;
        assert_eq!(emission.stream, Stream::Partial);
        assert_eq!(
            emission.record.message.as_deref(),
            Some("[TextExtraction text-1] unable to extract text")
        );
    }
}
