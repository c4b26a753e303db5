//! Format stage: coerces freshly harvested documents into the canonical
//! record shape.
//!
//! Harvested payloads arrive with whatever fields the provider supplied.
//! This stage trims string fields, fills in structural defaults, and
//! diverts documents that lack the one field nothing downstream can work
//! without: the material URL.

use crate::bolt::{divert, Bolt, Emission};
use async_trait::async_trait;
use oerhub_common::models::MaterialRecord;

pub struct MaterialFormatBolt {
    name: String,
    prefix: String,
}

impl MaterialFormatBolt {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: format!("[MaterialFormat {}]", name),
        }
    }
}

fn trim_in_place(field: &mut Option<String>) {
    if let Some(value) = field {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *field = Some(trimmed.to_string());
        }
    }
}

#[async_trait]
impl Bolt for MaterialFormatBolt {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, mut record: MaterialRecord) -> Emission {
        if record.url().map_or(true, |u| u.trim().is_empty()) {
            return divert(record, &self.prefix, "material has no materialurl");
        }

        trim_in_place(&mut record.title);
        trim_in_place(&mut record.description);
        trim_in_place(&mut record.author);
        trim_in_place(&mut record.materialurl);
        trim_in_place(&mut record.provideruri);

        // Language codes are matched case-sensitively downstream.
        if let Some(lang) = record.language.take() {
            record.language = Some(lang.trim().to_lowercase());
        }

        Emission::main(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::Stream;

    #[tokio::test]
    async fn document_without_url_goes_partial() {
        let bolt = MaterialFormatBolt::new("format-1");
        let emission = bolt.process(MaterialRecord::default()).await;
        assert_eq!(emission.stream, Stream::Partial);
        assert!(emission
            .record
            .message
            .unwrap()
            .starts_with("[MaterialFormat format-1]"));
    }

    #[tokio::test]
    async fn fields_are_trimmed_and_language_lowercased() {
        let bolt = MaterialFormatBolt::new("format-1");
        let record = MaterialRecord {
            title: Some("  Intro to Graphs ".to_string()),
            materialurl: Some("https://example.org/m/1".to_string()),
            language: Some(" EN".to_string()),
            ..Default::default()
        };

        let emission = bolt.process(record).await;
        assert_eq!(emission.stream, Stream::Main);
        assert_eq!(emission.record.title.as_deref(), Some("Intro to Graphs"));
        assert_eq!(emission.record.language.as_deref(), Some("en"));
    }
}
