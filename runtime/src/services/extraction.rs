use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::pipeline::types::TextChunk;
use crate::storage::SourceType;

pub const EXTRACTION_ADDED: &str = "added";
pub const EXTRACTION_SKIPPED: &str = "skipped";

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRequest {
    pub origin: String,
    pub source_type: SourceType,
    pub owner_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionOutcome {
    pub status: String,
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default, rename = "chunk_list")]
    pub chunks: Vec<TextChunk>,
}

impl ExtractionOutcome {
    /// Only these two status literals count as a successful extraction;
    /// the text must additionally be non-empty.
    pub fn status_ok(&self) -> bool {
        self.status == EXTRACTION_ADDED || self.status == EXTRACTION_SKIPPED
    }

    pub fn has_text(&self) -> bool {
        !self.extracted_text.trim().is_empty()
    }
}

/// Boundary to the external text-extraction service. The coordinator calls
/// this synchronously; internals of the service are out of scope.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome>;
}

pub struct HttpExtractionService {
    http: Client,
    base: String,
}

impl HttpExtractionService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("failed to build extraction http client")?;
        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ExtractionService for HttpExtractionService {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome> {
        let resp = self
            .http
            .post(format!("{}/extract", self.base))
            .json(request)
            .send()
            .await
            .context("extraction service unreachable")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("extraction service returned {status}: {body}");
        }

        resp.json::<ExtractionOutcome>()
            .await
            .context("failed to decode extraction response")
    }
}
