//! Type stage: classifies the material format from its URL.
//!
//! Sets `type` to the detected extension and mime type. An unrecognized or
//! missing extension leaves `type` unset and the record continues on the
//! main stream; classification is best-effort, not a gate.

use crate::bolt::{Bolt, Emission};
use async_trait::async_trait;
use oerhub_common::models::{MaterialRecord, TypeInfo};

pub struct MaterialTypeBolt {
    name: String,
}

impl MaterialTypeBolt {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Extension to mime mapping for the material formats the platform harvests.
fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "pdf" => Some("application/pdf"),
        "doc" => Some("application/msword"),
        "docx" => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        "ppt" => Some("application/vnd.ms-powerpoint"),
        "pptx" => {
            Some("application/vnd.openxmlformats-officedocument.presentationml.presentation")
        }
        "txt" => Some("text/plain"),
        "html" | "htm" => Some("text/html"),
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "mp3" => Some("audio/mpeg"),
        _ => None,
    }
}

/// Extract the lowercase file extension from a URL path, ignoring query and
/// fragment parts.
fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext.to_lowercase())
}

#[async_trait]
impl Bolt for MaterialTypeBolt {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, mut record: MaterialRecord) -> Emission {
        if record.material_type.is_none() {
            if let Some(ext) = record.url().and_then(extension_from_url) {
                if let Some(mime) = mime_for_extension(&ext) {
                    record.material_type = Some(TypeInfo {
                        ext,
                        mime: mime.to_string(),
                    });
                }
            }
        }
        Emission::main(record)
    }
}
