//! Transcription-extraction stage.
//!
//! For materials whose origin language is in the configured supported set,
//! submits the raw text to the external transcription/translation platform,
//! polls the job until a terminal status, fetches the per-language outputs
//! and merges them into the record. Materials in unsupported languages pass
//! through untouched.
//!
//! Job lifecycle state is persisted per material URL with full-snapshot
//! upserts, so a redelivered record overwrites its own row rather than
//! duplicating it. Scratch artifacts live in a per-job directory and are
//! removed best-effort once submission succeeds.

use crate::bolt::{divert, Bolt, Emission};
use crate::store::ProcessStore;
use crate::ttp::{
    ascii_fold, build_translation_plan, classify_status, external_job_id, JobManifest,
    ManifestDocument, StatusOutcome, TranscriptionService,
};
use async_trait::async_trait;
use chrono::Utc;
use oerhub_common::config::TtpConfig;
use oerhub_common::models::{MaterialRecord, ProcessState};
use oerhub_common::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Typed, validated stage configuration.
#[derive(Debug, Clone)]
pub struct TranscriptionSettings {
    /// Languages the platform is asked to produce, including the pivot.
    pub languages: Vec<String>,
    /// Intermediate language for two-hop translation paths.
    pub pivot_language: String,
    /// Output format codes with their names, e.g. `(3, "plain")`.
    pub formats: Vec<(i32, String)>,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Cap on total polling duration; expiry is a failure.
    pub poll_deadline: Duration,
    pub test_mode: bool,
    /// Root of the per-job scratch directories.
    pub tmp_folder: PathBuf,
}

impl TranscriptionSettings {
    /// Validate raw configuration at topology-construction time.
    pub fn from_config(config: &TtpConfig) -> Result<Self> {
        if config.languages.is_empty() {
            return Err(Error::Config("transcription languages set is empty".into()));
        }
        if !config.languages.contains(&config.pivot_language) {
            return Err(Error::Config(format!(
                "pivot language '{}' is not in the configured language set",
                config.pivot_language
            )));
        }
        if config.formats.is_empty() {
            return Err(Error::Config("transcription formats set is empty".into()));
        }
        if config.poll_interval_secs == 0 {
            return Err(Error::Config("poll interval must be positive".into()));
        }
        if config.poll_deadline_secs < config.poll_interval_secs {
            return Err(Error::Config(
                "poll deadline must be at least one poll interval".into(),
            ));
        }
        Ok(Self {
            languages: config.languages.clone(),
            pivot_language: config.pivot_language.clone(),
            formats: config.formats.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            poll_deadline: Duration::from_secs(config.poll_deadline_secs),
            test_mode: config.test_mode,
            tmp_folder: config.tmp_folder.clone(),
        })
    }

    fn supports(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }

    fn plain_format_name(&self) -> &str {
        self.formats
            .iter()
            .find(|(_, name)| name == "plain")
            .map(|(_, name)| name.as_str())
            .unwrap_or_else(|| self.formats[0].1.as_str())
    }
}

/// Terminal result of the polling state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PollOutcome {
    Done,
    Failed { code: i64, anomaly: bool },
    Expired,
}

pub struct TtpTranscriptionBolt {
    name: String,
    prefix: String,
    settings: TranscriptionSettings,
    service: Arc<dyn TranscriptionService>,
    store: Arc<dyn ProcessStore>,
}

impl TtpTranscriptionBolt {
    pub fn new(
        name: &str,
        settings: TranscriptionSettings,
        service: Arc<dyn TranscriptionService>,
        store: Arc<dyn ProcessStore>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&settings.tmp_folder)?;
        Ok(Self {
            name: name.to_string(),
            prefix: format!("[TtpTranscription {}]", name),
            settings,
            service,
            store,
        })
    }

    /// Record the failure in process state (best-effort) and divert.
    async fn fail(&self, record: MaterialRecord, url: &str, why: String) -> Emission {
        if let Err(e) = self
            .store
            .mark_status(url, &format!("failed: {}", why), true)
            .await
        {
            tracing::warn!(
                stage = %self.name,
                material_url = url,
                "could not record failure in process state: {}",
                e
            );
        }
        divert(record, &self.prefix, why)
    }

    /// Poll job status until a terminal outcome, sleeping the configured
    /// interval between attempts and respecting the overall deadline.
    async fn poll_until_terminal(&self, job_id: &str) -> Result<PollOutcome> {
        let deadline = tokio::time::Instant::now() + self.settings.poll_deadline;
        let mut attempts: u32 = 0;

        loop {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                tracing::warn!(
                    stage = %self.name,
                    job_id,
                    attempts,
                    "polling deadline reached"
                );
                return Ok(PollOutcome::Expired);
            }

            let wait = self.settings.poll_interval.min(deadline - now);
            tokio::time::sleep(wait).await;
            if tokio::time::Instant::now() >= deadline {
                return Ok(PollOutcome::Expired);
            }

            let code = self.service.status(job_id).await?;
            attempts += 1;
            match classify_status(code) {
                StatusOutcome::Done => {
                    tracing::debug!(stage = %self.name, job_id, attempts, "job completed");
                    return Ok(PollOutcome::Done);
                }
                StatusOutcome::InProgress => {
                    tracing::debug!(stage = %self.name, job_id, code, "job still running");
                }
                StatusOutcome::Failed { code, protocol_anomaly } => {
                    return Ok(PollOutcome::Failed {
                        code,
                        anomaly: protocol_anomaly,
                    });
                }
            }
        }
    }

    /// Fetch every configured (language, format) output. An output the
    /// service reports as a JSON error payload is skipped; the remaining
    /// languages still merge.
    async fn fetch_outputs(
        &self,
        job_id: &str,
    ) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
        let mut transcriptions: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

        for language in &self.settings.languages {
            for (code, format_name) in &self.settings.formats {
                let output = self.service.fetch(job_id, language, *code).await?;

                // The platform answers per-language errors as JSON bodies
                // instead of transcription text.
                let is_error_payload = serde_json::from_str::<serde_json::Value>(&output)
                    .map(|v| v.is_object())
                    .unwrap_or(false);
                if is_error_payload {
                    tracing::warn!(
                        stage = %self.name,
                        job_id,
                        language = language.as_str(),
                        format = format_name.as_str(),
                        "service returned an error payload for this output; skipping"
                    );
                    continue;
                }

                transcriptions
                    .entry(language.clone())
                    .or_default()
                    .insert(format_name.clone(), output);
            }
        }
        Ok(transcriptions)
    }
}

#[async_trait]
impl Bolt for TtpTranscriptionBolt {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, mut record: MaterialRecord) -> Emission {
        // Materials outside the supported set pass through untouched.
        let origin = match record.language.clone() {
            Some(lang) if self.settings.supports(&lang) => lang,
            _ => return Emission::main(record),
        };

        let url = match record.url() {
            Some(u) => u.to_string(),
            None => return divert(record, &self.prefix, "material has no materialurl"),
        };
        let raw_text = match record.materialmetadata.raw_text.clone() {
            Some(t) if !t.is_empty() => t,
            _ => return divert(record, &self.prefix, "material has no raw text"),
        };

        let external_id = external_job_id();
        let checksum = content_checksum(&raw_text);
        let manifest = JobManifest {
            language: origin.clone(),
            documents: vec![ManifestDocument {
                external_id: external_id.clone(),
                title: ascii_fold(record.title.as_deref().unwrap_or("untitled")),
                filename: "material.txt".to_string(),
                fileformat: "txt".to_string(),
                checksum,
            }],
            requested_langs: build_translation_plan(
                &self.settings.languages,
                &origin,
                &self.settings.pivot_language,
            ),
            test_mode: self.settings.test_mode,
        };

        let manifest_value = match serde_json::to_value(&manifest) {
            Ok(v) => v,
            Err(e) => return divert(record, &self.prefix, format!("manifest encoding: {}", e)),
        };

        // Package text and manifest into the per-job scratch directory.
        let job_dir = self.settings.tmp_folder.join(&external_id);
        let package = match package_job(&job_dir, &raw_text, &manifest_value) {
            Ok(p) => p,
            Err(e) => {
                cleanup_scratch(&job_dir);
                return divert(record, &self.prefix, format!("packaging failed: {}", e));
            }
        };

        // Persist the submitted manifest before the remote call so a crash
        // afterwards still leaves a diagnosable row.
        let state = ProcessState {
            url: url.clone(),
            status: "submitted".to_string(),
            manifest: Some(manifest_value),
            start_process_time: Some(Utc::now()),
            end_process_time: None,
        };
        if let Err(e) = self.store.upsert(&state).await {
            cleanup_scratch(&job_dir);
            return divert(
                record,
                &self.prefix,
                format!("process state upsert failed: {}", e),
            );
        }

        let submitted = self.service.submit(&manifest, &package).await;
        cleanup_scratch(&job_dir);
        let job_id = match submitted {
            Ok(id) => id,
            Err(e) => return self.fail(record, &url, e.to_string()).await,
        };

        tracing::info!(
            stage = %self.name,
            material_url = url.as_str(),
            job_id = job_id.as_str(),
            "submitted transcription job"
        );

        let outcome = match self.poll_until_terminal(&job_id).await {
            Ok(o) => o,
            Err(e) => {
                return self
                    .fail(record, &url, format!("{} for process_id={}", e, job_id))
                    .await
            }
        };
        match outcome {
            PollOutcome::Done => {}
            PollOutcome::Failed { code, anomaly } => {
                let detail = if anomaly {
                    "unexpected-process-message"
                } else {
                    "error on service side"
                };
                return self
                    .fail(
                        record,
                        &url,
                        format!("[status_code: {}] {} for process_id={}", code, detail, job_id),
                    )
                    .await;
            }
            PollOutcome::Expired => {
                return self
                    .fail(
                        record,
                        &url,
                        format!("polling deadline exceeded for process_id={}", job_id),
                    )
                    .await;
            }
        }

        let fetched = match self.fetch_outputs(&job_id).await {
            Ok(t) => t,
            Err(e) => {
                return self
                    .fail(record, &url, format!("{} for process_id={}", e, job_id))
                    .await
            }
        };

        // The origin-language plain output becomes the primary raw text.
        if let Some(primary) = fetched
            .get(&origin)
            .and_then(|formats| formats.get(self.settings.plain_format_name()))
        {
            record.materialmetadata.raw_text = Some(primary.clone());
        }
        let merged = record
            .materialmetadata
            .transcriptions
            .get_or_insert_with(BTreeMap::new);
        for (language, formats) in fetched {
            merged.entry(language).or_default().extend(formats);
        }

        if let Err(e) = self.store.mark_status(&url, "finished", true).await {
            return divert(
                record,
                &self.prefix,
                format!("process state update failed: {}", e),
            );
        }

        Emission::main(record)
    }

    async fn shutdown(&self) {
        // Scratch dirs are removed after submission; anything left behind
        // belongs to jobs interrupted mid-packaging and is namespaced per
        // job id, so it cannot corrupt later runs.
        tracing::debug!(stage = %self.name, "transcription stage shut down");
    }
}

/// SHA-256 digest of the material text, hex-encoded. Used for change
/// detection so byte-identical content produces the same checksum on every
/// submission.
pub fn content_checksum(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Write `material.txt` and `manifest.json` into the job directory and zip
/// them (stored, no compression) as the upload package.
fn package_job(
    job_dir: &Path,
    raw_text: &str,
    manifest: &serde_json::Value,
) -> Result<PathBuf> {
    std::fs::create_dir_all(job_dir)?;

    let text_path = job_dir.join("material.txt");
    std::fs::write(&text_path, raw_text)?;
    let manifest_path = job_dir.join("manifest.json");
    std::fs::write(&manifest_path, serde_json::to_vec(manifest)?)?;

    let package_path = job_dir.join("document-package.zip");
    let file = std::fs::File::create(&package_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);

    writer
        .start_file("material.txt", options)
        .map_err(zip_error)?;
    writer.write_all(raw_text.as_bytes())?;
    writer
        .start_file("manifest.json", options)
        .map_err(zip_error)?;
    writer.write_all(&serde_json::to_vec(manifest)?)?;
    writer.finish().map_err(zip_error)?;

    Ok(package_path)
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::Internal(format!("archive packaging: {}", e))
}

/// Remove a job's scratch directory. Best-effort: a failure only logs, and
/// per-job naming keeps stale directories from interfering with later runs.
fn cleanup_scratch(job_dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(job_dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("could not remove scratch dir {}: {}", job_dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::Stream;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedService {
        statuses: Mutex<VecDeque<i64>>,
        status_calls: AtomicUsize,
        submitted: Mutex<Vec<JobManifest>>,
        fail_submit: bool,
        outputs: HashMap<(String, i32), String>,
    }

    impl ScriptedService {
        fn new(statuses: Vec<i64>, outputs: HashMap<(String, i32), String>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                status_calls: AtomicUsize::new(0),
                submitted: Mutex::new(Vec::new()),
                fail_submit: false,
                outputs,
            }
        }
    }

    #[async_trait]
    impl TranscriptionService for ScriptedService {
        async fn submit(&self, manifest: &JobManifest, package: &Path) -> Result<String> {
            assert!(package.exists(), "package must exist at submit time");
            if self.fail_submit {
                return Err(Error::ExternalService(
                    "[status_code: 4] error when uploading process_id=j-1".into(),
                ));
            }
            self.submitted.lock().unwrap().push(manifest.clone());
            Ok("job-1".to_string())
        }

        async fn status(&self, _job_id: &str) -> Result<i64> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            match statuses.pop_front() {
                Some(code) => Ok(code),
                // Keep reporting in-progress once the script runs out.
                None => Ok(2),
            }
        }

        async fn fetch(&self, _job_id: &str, language: &str, format_code: i32) -> Result<String> {
            Ok(self
                .outputs
                .get(&(language.to_string(), format_code))
                .cloned()
                .unwrap_or_else(|| r#"{"error": "no output"}"#.to_string()))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<HashMap<String, ProcessState>>,
    }

    #[async_trait]
    impl ProcessStore for MemoryStore {
        async fn upsert(&self, state: &ProcessState) -> Result<()> {
            self.rows
                .lock()
                .unwrap()
                .insert(state.url.clone(), state.clone());
            Ok(())
        }

        async fn mark_status(&self, url: &str, status: &str, finished: bool) -> Result<()> {
            if let Some(row) = self.rows.lock().unwrap().get_mut(url) {
                row.status = status.to_string();
                if finished {
                    row.end_process_time = Some(Utc::now());
                }
            }
            Ok(())
        }

        async fn get(&self, url: &str) -> Result<Option<ProcessState>> {
            Ok(self.rows.lock().unwrap().get(url).cloned())
        }
    }

    fn settings(tmp: &Path) -> TranscriptionSettings {
        TranscriptionSettings {
            languages: vec!["en".to_string(), "es".to_string()],
            pivot_language: "en".to_string(),
            formats: vec![(3, "plain".to_string())],
            poll_interval: Duration::from_millis(50),
            poll_deadline: Duration::from_secs(5),
            test_mode: true,
            tmp_folder: tmp.to_path_buf(),
        }
    }

    fn english_record() -> MaterialRecord {
        let mut record = MaterialRecord {
            title: Some("Intro to Graphs".to_string()),
            materialurl: Some("https://example.org/m/1".to_string()),
            language: Some("en".to_string()),
            ..Default::default()
        };
        record.materialmetadata.raw_text = Some("a graph is a set of vertices".to_string());
        record
    }

    fn outputs() -> HashMap<(String, i32), String> {
        let mut map = HashMap::new();
        map.insert(("en".to_string(), 3), "english transcription".to_string());
        map.insert(("es".to_string(), 3), "transcripcion espanola".to_string());
        map
    }

    #[tokio::test]
    async fn unsupported_language_passes_through_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new(vec![], HashMap::new()));
        let store = Arc::new(MemoryStore::default());
        let bolt = TtpTranscriptionBolt::new(
            "ttp-1",
            settings(tmp.path()),
            service.clone(),
            store.clone(),
        )
        .unwrap();

        let mut record = english_record();
        record.language = Some("fr".to_string());
        let input = record.clone();

        let emission = bolt.process(record).await;
        assert_eq!(emission.stream, Stream::Main);
        // Byte-identical: no metadata mutation, no message, nothing persisted.
        assert_eq!(emission.record, input);
        assert_eq!(
            serde_json::to_vec(&emission.record).unwrap(),
            serde_json::to_vec(&input).unwrap()
        );
        assert!(store.rows.lock().unwrap().is_empty());
        assert!(service.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_done_then_merges_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new(vec![2, 4, 6], outputs()));
        let store = Arc::new(MemoryStore::default());
        let bolt = TtpTranscriptionBolt::new(
            "ttp-1",
            settings(tmp.path()),
            service.clone(),
            store.clone(),
        )
        .unwrap();

        let emission = bolt.process(english_record()).await;
        assert_eq!(emission.stream, Stream::Main);

        // Exactly three polls for the status sequence [2, 4, 6].
        assert_eq!(service.status_calls.load(Ordering::SeqCst), 3);

        // Per-language outputs merged; the origin-language plain output is
        // promoted to the primary raw text.
        let metadata = &emission.record.materialmetadata;
        assert_eq!(metadata.raw_text.as_deref(), Some("english transcription"));
        let transcriptions = metadata.transcriptions.as_ref().unwrap();
        assert_eq!(transcriptions["es"]["plain"], "transcripcion espanola");

        let state = store
            .get("https://example.org/m/1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.status, "finished");
        assert!(state.end_process_time.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn error_status_code_diverts_with_code_in_message() {
        let tmp = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new(vec![2, 130], outputs()));
        let store = Arc::new(MemoryStore::default());
        let bolt = TtpTranscriptionBolt::new(
            "ttp-1",
            settings(tmp.path()),
            service.clone(),
            store.clone(),
        )
        .unwrap();

        let emission = bolt.process(english_record()).await;
        assert_eq!(emission.stream, Stream::Partial);
        assert_eq!(service.status_calls.load(Ordering::SeqCst), 2);

        let message = emission.record.message.unwrap();
        assert!(message.starts_with("[TtpTranscription ttp-1]"));
        assert!(message.contains("130"));
        assert!(message.contains("error on service side"));

        let state = store
            .get("https://example.org/m/1")
            .await
            .unwrap()
            .unwrap();
        assert!(state.status.starts_with("failed:"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_diverts() {
        let tmp = tempfile::tempdir().unwrap();
        // Service never leaves the in-progress range.
        let service = Arc::new(ScriptedService::new(vec![], outputs()));
        let store = Arc::new(MemoryStore::default());
        let mut config = settings(tmp.path());
        config.poll_interval = Duration::from_millis(50);
        config.poll_deadline = Duration::from_millis(170);
        let bolt =
            TtpTranscriptionBolt::new("ttp-1", config, service.clone(), store.clone()).unwrap();

        let emission = bolt.process(english_record()).await;
        assert_eq!(emission.stream, Stream::Partial);
        assert!(emission
            .record
            .message
            .unwrap()
            .contains("polling deadline exceeded"));
        // Some polls happened before expiry, but the loop did terminate.
        assert!(service.status_calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resubmission_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new(vec![6, 6], outputs()));
        let store = Arc::new(MemoryStore::default());
        let bolt = TtpTranscriptionBolt::new(
            "ttp-1",
            settings(tmp.path()),
            service.clone(),
            store.clone(),
        )
        .unwrap();

        bolt.process(english_record()).await;
        bolt.process(english_record()).await;

        // Same content digest both times, and a single process-state row.
        let submitted = service.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 2);
        assert_eq!(
            submitted[0].documents[0].checksum,
            submitted[1].documents[0].checksum
        );
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submit_failure_diverts_and_cleans_scratch() {
        let tmp = tempfile::tempdir().unwrap();
        let mut service = ScriptedService::new(vec![], HashMap::new());
        service.fail_submit = true;
        let store = Arc::new(MemoryStore::default());
        let bolt = TtpTranscriptionBolt::new(
            "ttp-1",
            settings(tmp.path()),
            Arc::new(service),
            store.clone(),
        )
        .unwrap();

        let emission = bolt.process(english_record()).await;
        assert_eq!(emission.stream, Stream::Partial);
        assert!(emission
            .record
            .message
            .unwrap()
            .contains("error when uploading"));

        // No per-job scratch directories left behind.
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn per_language_error_payloads_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut output_map = HashMap::new();
        // The origin language output is an error payload; only es succeeds.
        output_map.insert(("en".to_string(), 3), r#"{"error": "bad"}"#.to_string());
        output_map.insert(("es".to_string(), 3), "transcripcion espanola".to_string());
        let service = Arc::new(ScriptedService::new(vec![6], output_map));
        let store = Arc::new(MemoryStore::default());
        let bolt = TtpTranscriptionBolt::new(
            "ttp-1",
            settings(tmp.path()),
            service,
            store,
        )
        .unwrap();

        let emission = bolt.process(english_record()).await;
        assert_eq!(emission.stream, Stream::Main);

        let metadata = &emission.record.materialmetadata;
        // Original raw text kept: no en output to promote.
        assert_eq!(
            metadata.raw_text.as_deref(),
            Some("a graph is a set of vertices")
        );
        let transcriptions = metadata.transcriptions.as_ref().unwrap();
        assert!(!transcriptions.contains_key("en"));
        assert_eq!(transcriptions["es"]["plain"], "transcripcion espanola");
    }

    #[tokio::test]
    async fn missing_raw_text_diverts() {
        let tmp = tempfile::tempdir().unwrap();
        let service = Arc::new(ScriptedService::new(vec![], HashMap::new()));
        let store = Arc::new(MemoryStore::default());
        let bolt =
            TtpTranscriptionBolt::new("ttp-1", settings(tmp.path()), service, store).unwrap();

        let mut record = english_record();
        record.materialmetadata.raw_text = None;

        let emission = bolt.process(record).await;
        assert_eq!(emission.stream, Stream::Partial);
        assert!(emission.record.message.unwrap().contains("no raw text"));
    }

    #[test]
    fn settings_validation() {
        let mut config = TtpConfig::default();
        config.pivot_language = "fr".to_string();
        assert!(TranscriptionSettings::from_config(&config).is_err());

        let mut config = TtpConfig::default();
        config.languages.clear();
        assert!(TranscriptionSettings::from_config(&config).is_err());

        let mut config = TtpConfig::default();
        config.poll_deadline_secs = 1;
        config.poll_interval_secs = 30;
        assert!(TranscriptionSettings::from_config(&config).is_err());

        assert!(TranscriptionSettings::from_config(&TtpConfig::default()).is_ok());
    }

    #[test]
    fn checksum_is_stable_for_identical_content() {
        let a = content_checksum("a graph is a set of vertices");
        let b = content_checksum("a graph is a set of vertices");
        assert_eq!(a, b);
        assert_ne!(a, content_checksum("different text"));
    }

    #[test]
    fn package_contains_text_and_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let job_dir = tmp.path().join("job-abc");
        let manifest = serde_json::json!({"language": "en"});

        let package = package_job(&job_dir, "raw text", &manifest).unwrap();
        assert!(package.ends_with("document-package.zip"));

        let file = std::fs::File::open(&package).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"material.txt".to_string()));
        assert!(names.contains(&"manifest.json".to_string()));
    }
}
