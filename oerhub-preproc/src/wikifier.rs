//! External concept-annotation (wikification) service interface.
//!
//! Sends material text to the wikifier endpoint and maps returned
//! annotations to [`WikipediaConcept`]s. Requests are rate limited; the
//! public annotation service enforces a per-key quota.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use oerhub_common::config::WikifierConfig;
use oerhub_common::models::WikipediaConcept;
use oerhub_common::{Error, Result};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

/// Narrow contract against the annotation service.
#[async_trait]
pub trait ConceptAnnotator: Send + Sync {
    /// Annotate text in the given language; returns the extracted concepts.
    async fn annotate(&self, text: &str, language: &str) -> Result<Vec<WikipediaConcept>>;
}

#[derive(Debug, Deserialize)]
struct WikifierResponse {
    #[serde(default)]
    annotations: Vec<WikifierAnnotation>,
}

#[derive(Debug, Deserialize)]
struct WikifierAnnotation {
    title: String,
    url: String,
    lang: String,
    #[serde(default)]
    support: Vec<serde_json::Value>,
    #[serde(rename = "pageRank", default)]
    page_rank: f64,
    #[serde(default)]
    cosine: f64,
}

/// HTTP client for the wikifier service.
pub struct WikifierClient {
    client: reqwest::Client,
    url: String,
    user_key: String,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl WikifierClient {
    pub fn new(config: &WikifierConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(Error::Config("wikifier url is empty".into()));
        }
        let per_second = NonZeroU32::new(config.requests_per_second)
            .ok_or_else(|| Error::Config("wikifier requests_per_second must be > 0".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            user_key: config.user_key.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }
}

#[async_trait]
impl ConceptAnnotator for WikifierClient {
    async fn annotate(&self, text: &str, language: &str) -> Result<Vec<WikipediaConcept>> {
        // Wait for a permit before touching the service.
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .post(&self.url)
            .form(&[
                ("userKey", self.user_key.as_str()),
                ("text", text),
                ("lang", language),
            ])
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("wikifier request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ExternalService(format!(
                "wikifier returned HTTP {}",
                status
            )));
        }

        let body: WikifierResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("parse wikifier response: {}", e)))?;

        let concepts = body
            .annotations
            .into_iter()
            .map(|a| WikipediaConcept {
                name: a.title,
                uri: a.url,
                lang: a.lang,
                support_len: a.support.len() as u64,
                page_rank: a.page_rank,
                cosine: a.cosine,
            })
            .collect();
        Ok(concepts)
    }
}
