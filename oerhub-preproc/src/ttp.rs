//! External transcription/translation platform interface.
//!
//! The platform accepts an uploaded job package (raw text plus a manifest),
//! reports job status through a numeric code, and serves per-language,
//! per-format outputs once processing completes. Status code 6 is the sole
//! success terminal; lower codes mean the job is still running; anything
//! else is a failure, with codes below 100 flagged as a protocol-level
//! anomaly rather than a reported service error.

use async_trait::async_trait;
use oerhub_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// The success terminal of the job status scale.
pub const STATUS_DONE: i64 = 6;

/// Interpretation of a polled status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Done,
    InProgress,
    Failed {
        code: i64,
        /// Codes below 100 are not part of the service's documented error
        /// range and indicate a protocol mismatch.
        protocol_anomaly: bool,
    },
}

/// Classify a raw status code from the platform.
pub fn classify_status(code: i64) -> StatusOutcome {
    if code == STATUS_DONE {
        StatusOutcome::Done
    } else if code < STATUS_DONE {
        StatusOutcome::InProgress
    } else {
        StatusOutcome::Failed {
            code,
            protocol_anomaly: code < 100,
        }
    }
}

/// One hop of a translation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHop {
    pub l: String,
}

/// Per-language translation request. An empty entry asks for a direct
/// transcription/translation; `tlpath` routes through intermediate hops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLanguage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlpath: Option<Vec<PathHop>>,
}

/// A document entry of the job manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    pub external_id: String,
    pub title: String,
    pub filename: String,
    pub fileformat: String,
    /// Content digest of the raw text, for change detection on the
    /// platform side.
    pub checksum: String,
}

/// The job manifest submitted alongside the text package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobManifest {
    /// Origin language of the material.
    pub language: String,
    pub documents: Vec<ManifestDocument>,
    pub requested_langs: BTreeMap<String, RequestedLanguage>,
    pub test_mode: bool,
}

/// Build the translation plan for one material.
///
/// Every configured target language other than the origin and the pivot is
/// translated in two hops through the pivot; the origin and pivot languages
/// translate directly. A material already in the pivot language needs no
/// paths at all.
pub fn build_translation_plan(
    languages: &[String],
    origin: &str,
    pivot: &str,
) -> BTreeMap<String, RequestedLanguage> {
    let mut plan = BTreeMap::new();
    for lang in languages {
        let mut requested = RequestedLanguage::default();
        if origin != pivot && lang != pivot && lang != origin {
            requested.tlpath = Some(vec![
                PathHop {
                    l: pivot.to_string(),
                },
                PathHop { l: lang.clone() },
            ]);
        }
        plan.insert(lang.clone(), requested);
    }
    plan
}

/// Generate a collision-resistant external job identifier: a random
/// alphanumeric token plus a millisecond timestamp component.
pub fn external_job_id() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(26)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("{}{}", token, chrono::Utc::now().timestamp_millis())
}

/// Fold common accented Latin characters to their closest ASCII form.
/// The platform rejects manifests whose document titles carry characters
/// outside its supported set; unknown characters pass through unchanged.
pub fn ascii_fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'á' | 'à' | 'â' | 'ã' | 'å' | 'ā' | 'ă' | 'ą' => out.push('a'),
            'Á' | 'À' | 'Â' | 'Ã' | 'Å' | 'Ā' | 'Ă' | 'Ą' => out.push('A'),
            'ä' | 'æ' => out.push_str("ae"),
            'Ä' | 'Æ' => out.push_str("AE"),
            'ç' | 'ć' | 'č' | 'ĉ' => out.push('c'),
            'Ç' | 'Ć' | 'Č' | 'Ĉ' => out.push('C'),
            'ď' | 'đ' => out.push('d'),
            'Ď' | 'Đ' => out.push('D'),
            'é' | 'è' | 'ê' | 'ë' | 'ě' | 'ė' | 'ę' | 'ē' => out.push('e'),
            'É' | 'È' | 'Ê' | 'Ë' | 'Ě' | 'Ė' | 'Ę' | 'Ē' => out.push('E'),
            'í' | 'ì' | 'î' | 'ï' | 'ī' | 'į' => out.push('i'),
            'Í' | 'Ì' | 'Î' | 'Ï' | 'Ī' | 'Į' => out.push('I'),
            'ñ' | 'ń' | 'ň' => out.push('n'),
            'Ñ' | 'Ń' | 'Ň' => out.push('N'),
            'ó' | 'ò' | 'ô' | 'õ' | 'ő' | 'ō' => out.push('o'),
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ő' | 'Ō' => out.push('O'),
            'ö' | 'ø' => out.push_str("oe"),
            'Ö' | 'Ø' => out.push_str("OE"),
            'ř' | 'ŕ' => out.push('r'),
            'Ř' | 'Ŕ' => out.push('R'),
            'š' | 'ś' | 'ş' | 'ș' => out.push('s'),
            'Š' | 'Ś' | 'Ş' | 'Ș' => out.push('S'),
            'ß' => out.push_str("ss"),
            'ť' | 'ţ' | 'ț' => out.push('t'),
            'Ť' | 'Ţ' | 'Ț' => out.push('T'),
            'ú' | 'ù' | 'û' | 'ů' | 'ű' | 'ū' | 'ų' => out.push('u'),
            'Ú' | 'Ù' | 'Û' | 'Ů' | 'Ű' | 'Ū' | 'Ų' => out.push('U'),
            'ü' => out.push_str("ue"),
            'Ü' => out.push_str("UE"),
            'ý' | 'ÿ' => out.push('y'),
            'Ý' | 'Ÿ' => out.push('Y'),
            'ž' | 'ź' | 'ż' => out.push('z'),
            'Ž' | 'Ź' | 'Ż' => out.push('Z'),
            other => out.push(other),
        }
    }
    out
}

/// Narrow contract against the external platform.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Submit a job package; returns the platform's job handle.
    async fn submit(&self, manifest: &JobManifest, package: &Path) -> Result<String>;

    /// Current status code for a job handle.
    async fn status(&self, job_id: &str) -> Result<i64>;

    /// Fetch one output for a completed job.
    async fn fetch(&self, job_id: &str, language: &str, format_code: i32) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    rcode: i64,
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status_code: i64,
}

/// HTTP client for the platform.
pub struct TtpClient {
    client: reqwest::Client,
    base_url: String,
    user: String,
    token: String,
}

impl TtpClient {
    pub fn new(base_url: String, user: String, token: String) -> Result<Self> {
        if base_url.is_empty() {
            return Err(Error::Config("transcription service url is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            user,
            token,
        })
    }

    fn auth_query(&self) -> [(&'static str, &str); 2] {
        [("user", self.user.as_str()), ("auth_token", self.token.as_str())]
    }
}

#[async_trait]
impl TranscriptionService for TtpClient {
    async fn submit(&self, manifest: &JobManifest, package: &Path) -> Result<String> {
        let archive = tokio::fs::read(package).await?;
        let manifest_json = serde_json::to_string(manifest)?;

        let form = reqwest::multipart::Form::new()
            .text("manifest", manifest_json)
            .part(
                "document_package",
                reqwest::multipart::Part::bytes(archive)
                    .file_name("document-package.zip")
                    .mime_str("application/zip")
                    .map_err(|e| Error::Internal(format!("multipart part: {}", e)))?,
            );

        let response = self
            .client
            .post(format!("{}/ingest/new", self.base_url))
            .query(&self.auth_query())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("submit request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ExternalService(format!(
                "submit returned HTTP {}",
                status
            )));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("parse submit response: {}", e)))?;

        if body.rcode != 0 {
            return Err(Error::ExternalService(format!(
                "[status_code: {}] error when uploading process_id={}",
                body.rcode, body.id
            )));
        }
        Ok(body.id)
    }

    async fn status(&self, job_id: &str) -> Result<i64> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .query(&self.auth_query())
            .query(&[("id", job_id)])
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("status request failed: {}", e)))?;

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("parse status response: {}", e)))?;
        Ok(body.status_code)
    }

    async fn fetch(&self, job_id: &str, language: &str, format_code: i32) -> Result<String> {
        let format = format_code.to_string();
        let response = self
            .client
            .get(format!("{}/get", self.base_url))
            .query(&self.auth_query())
            .query(&[("id", job_id), ("lang", language), ("format", &format)])
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("fetch request failed: {}", e)))?;

        response
            .text()
            .await
            .map_err(|e| Error::ExternalService(format!("read fetch response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languages() -> Vec<String> {
        vec!["en", "es", "sl", "de"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn pivot_origin_gets_all_direct_paths() {
        let plan = build_translation_plan(&languages(), "en", "en");
        for lang in ["en", "es", "sl", "de"] {
            assert!(plan[lang].tlpath.is_none(), "{} should be direct", lang);
        }
    }

    #[test]
    fn non_pivot_origin_routes_through_pivot() {
        let plan = build_translation_plan(&languages(), "es", "en");

        // en is the pivot: direct. es is the origin: direct.
        assert!(plan["en"].tlpath.is_none());
        assert!(plan["es"].tlpath.is_none());

        // de and sl take two hops through en.
        for lang in ["de", "sl"] {
            let path = plan[lang].tlpath.as_ref().unwrap();
            assert_eq!(path.len(), 2);
            assert_eq!(path[0].l, "en");
            assert_eq!(path[1].l, lang);
        }
    }

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(6), StatusOutcome::Done);
        assert_eq!(classify_status(0), StatusOutcome::InProgress);
        assert_eq!(classify_status(5), StatusOutcome::InProgress);
        assert_eq!(
            classify_status(20),
            StatusOutcome::Failed {
                code: 20,
                protocol_anomaly: true
            }
        );
        assert_eq!(
            classify_status(130),
            StatusOutcome::Failed {
                code: 130,
                protocol_anomaly: false
            }
        );
    }

    #[test]
    fn job_ids_are_unique_and_lowercase_alphanumeric() {
        let a = external_job_id();
        let b = external_job_id();
        assert_ne!(a, b);
        assert!(a.len() > 26);
        assert!(a.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn ascii_fold_handles_common_diacritics() {
        assert_eq!(ascii_fold("Introducción a Führung"), "Introduccion a Fuehrung");
        assert_eq!(ascii_fold("Število π"), "Stevilo π");
        assert_eq!(ascii_fold("plain ascii"), "plain ascii");
    }

    #[test]
    fn manifest_serializes_with_translation_paths() {
        let manifest = JobManifest {
            language: "es".to_string(),
            documents: vec![ManifestDocument {
                external_id: "abc123".to_string(),
                title: "Grafos".to_string(),
                filename: "material.txt".to_string(),
                fileformat: "txt".to_string(),
                checksum: "deadbeef".to_string(),
            }],
            requested_langs: build_translation_plan(&languages(), "es", "en"),
            test_mode: true,
        };

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["requested_langs"]["de"]["tlpath"][0]["l"], "en");
        // Direct languages serialize without a tlpath key.
        assert!(value["requested_langs"]["en"].get("tlpath").is_none());
    }
}
