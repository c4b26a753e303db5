//! Text-extraction stage: guarantees downstream stages a usable
//! `materialmetadata.rawText`.
//!
//! Text-category materials carry their content either in `rawText` already
//! (harvester-extracted) or, for short-form materials, only in the
//! description. The stage normalizes whitespace; line breaks are kept or
//! collapsed per configuration. A material yielding no text diverts to the
//! partial stream.

use crate::bolt::{divert, Bolt, Emission};
use async_trait::async_trait;
use oerhub_common::models::MaterialRecord;

pub struct TextExtractionBolt {
    name: String,
    prefix: String,
    preserve_line_breaks: bool,
}

impl TextExtractionBolt {
    pub fn new(name: &str, preserve_line_breaks: bool) -> Self {
        Self {
            name: name.to_string(),
            prefix: format!("[TextExtraction {}]", name),
            preserve_line_breaks,
        }
    }

    fn normalize(&self, text: &str) -> String {
        if self.preserve_line_breaks {
            text.lines()
                .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        } else {
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        }
    }
}

#[async_trait]
impl Bolt for TextExtractionBolt {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, mut record: MaterialRecord) -> Emission {
        let source = record
            .materialmetadata
            .raw_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                record
                    .description
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
            });

        let normalized = match source {
            Some(text) => self.normalize(text),
            None => {
                return divert(
                    record,
                    &self.prefix,
                    "unable to extract text content from material",
                )
            }
        };

        record.materialmetadata.raw_text = Some(normalized);
        Emission::main(record)
    }
}
