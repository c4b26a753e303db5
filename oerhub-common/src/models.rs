//! Material and process-state models shared across OERHub services.
//!
//! Field names follow the harvested-document JSON layout, so records parsed
//! from broker payloads round-trip without renaming. Downstream stages only
//! add fields; nothing here is ever removed once populated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detected material type: file extension plus mime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub ext: String,
    pub mime: String,
}

/// Metadata about the provider the material was harvested from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A Wikipedia concept annotated on the material text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikipediaConcept {
    pub name: String,
    pub uri: String,
    pub lang: String,
    #[serde(rename = "supportLen")]
    pub support_len: u64,
    #[serde(rename = "pageRank")]
    pub page_rank: f64,
    pub cosine: f64,
}

/// Metadata accreted by the processing stages.
///
/// `transcriptions` maps language code to format name to text, e.g.
/// `transcriptions["es"]["plain"]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialMetadata {
    #[serde(rename = "rawText", default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dfxp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcriptions: Option<BTreeMap<String, BTreeMap<String, String>>>,
    #[serde(
        rename = "wikipediaConcepts",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub wikipedia_concepts: Option<Vec<WikipediaConcept>>,
}

/// The unit of work flowing through the preprocessing pipeline.
///
/// All fields are optional at the type level; the format stage fills in
/// defaults and the validation stage enforces the required set. A record
/// diverted to the partial stream keeps everything accreted so far plus
/// exactly one failure `message`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provideruri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Two-letter origin language code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub material_type: Option<TypeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datecreated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dateretrieved: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providertoken: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providermetadata: Option<ProviderMetadata>,
    #[serde(default)]
    pub materialmetadata: MaterialMetadata,
    /// Failure message set by the stage that diverted the record to the
    /// partial stream. Absent on records that never failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MaterialRecord {
    /// The stable identity key of the record, when present.
    pub fn url(&self) -> Option<&str> {
        self.materialurl.as_deref()
    }
}

/// Persisted lifecycle state of a long-running external job, keyed by
/// material URL. Upserted so retries of the same material overwrite the
/// same row rather than creating duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessState {
    pub url: String,
    /// Current stage label, e.g. "submitted" or "finished".
    pub status: String,
    /// The job manifest sent to the external service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_process_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_process_time: Option<DateTime<Utc>>,
}
