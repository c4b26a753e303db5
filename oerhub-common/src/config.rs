//! Configuration loading for OERHub services.
//!
//! Settings come from a TOML file with environment-variable overrides for
//! deployment-specific values and secrets (`OERHUB_*`). Stage-level typed
//! configuration is derived from this at topology-construction time.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Broker topic wiring. Topic names and the consumer group are deployment
/// configuration, not part of the pipeline contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Topic the pipeline entry consumes from.
    pub input_topic: String,
    /// Topic the complete sink publishes to.
    pub complete_topic: String,
    /// Topic the partial sink publishes to.
    pub partial_topic: String,
    /// Consumer group identifier.
    pub group_id: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            input_topic: "PROCESSING.MATERIAL.TEXT".to_string(),
            complete_topic: "STORING.MATERIAL.COMPLETE".to_string(),
            partial_topic: "STORING.MATERIAL.PARTIAL".to_string(),
            group_id: "oerhub-preproc".to_string(),
        }
    }
}

/// Transcription/translation platform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtpConfig {
    pub url: String,
    pub user: String,
    pub token: String,
    /// Languages the platform is asked to transcribe/translate into.
    pub languages: Vec<String>,
    /// Intermediate language for two-hop translation paths.
    pub pivot_language: String,
    /// Output format codes mapped to format names, e.g. 3 -> "plain".
    pub formats: Vec<(i32, String)>,
    /// Delay between status polls, in seconds.
    pub poll_interval_secs: u64,
    /// Overall cap on polling duration, in seconds.
    pub poll_deadline_secs: u64,
    /// Submit jobs in the platform's test mode.
    pub test_mode: bool,
    /// Scratch directory for per-job archive packaging.
    pub tmp_folder: PathBuf,
}

impl Default for TtpConfig {
    fn default() -> Self {
        Self {
            url: "https://ttp.example.org/api/v3/text".to_string(),
            user: String::new(),
            token: String::new(),
            languages: vec!["en", "es", "sl", "de"]
                .into_iter()
                .map(String::from)
                .collect(),
            pivot_language: "en".to_string(),
            formats: vec![(3, "plain".to_string())],
            poll_interval_secs: 30,
            poll_deadline_secs: 3600,
            test_mode: true,
            tmp_folder: PathBuf::from("tmp"),
        }
    }
}

/// Wikifier (concept annotation) service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikifierConfig {
    pub url: String,
    pub user_key: String,
    /// Maximum annotation requests per second.
    pub requests_per_second: u32,
}

impl Default for WikifierConfig {
    fn default() -> Self {
        Self {
            url: "https://wikifier.example.org/annotate-article".to_string(),
            user_key: String::new(),
            requests_per_second: 1,
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// SQLite database path; defaults to `oerhub.db` in the working dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// HTTP port for the health endpoint.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub ttp: TtpConfig,
    #[serde(default)]
    pub wikifier: WikifierConfig,
}

fn default_port() -> u16 {
    5740
}

impl ServiceConfig {
    /// Load configuration from a TOML file, then apply `OERHUB_*`
    /// environment overrides. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("parse {}: {}", p.display(), e)))?
            }
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Secrets and deployment paths can be supplied via environment.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OERHUB_DB_PATH") {
            self.database_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("OERHUB_TTP_USER") {
            self.ttp.user = v;
        }
        if let Ok(v) = std::env::var("OERHUB_TTP_TOKEN") {
            self.ttp.token = v;
        }
        if let Ok(v) = std::env::var("OERHUB_WIKIFIER_KEY") {
            self.wikifier.user_key = v;
        }
    }

    /// Resolved database path.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("oerhub.db"))
    }
}
