use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::ai::{LlmClient, LlmSettings};
use crate::services::{ExtractionRequest, ExtractionService, GraphIngestApi};
use crate::storage::{SourceRecord, SourceStatus, SourceStore, SourceType};

use super::analysis::{self, AnalysisJob};
use super::kg::{self, KgJob};

/// The only errors visible to the original caller. Everything after the
/// accepted response is recorded into the source record instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("a source titled '{0}' already exists for this owner")]
    DuplicateTitle(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSource {
    pub owner_id: String,
    pub title: String,
    pub source_type: SourceType,
    pub origin: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub id: String,
    pub status: SourceStatus,
}

/// Intake for new sources: creates the lifecycle record, runs extraction
/// synchronously, then dispatches the background workers and returns
/// without waiting for them.
pub struct Coordinator {
    store: Arc<dyn SourceStore>,
    extraction: Arc<dyn ExtractionService>,
    graph_api: Arc<dyn GraphIngestApi>,
    llm: Arc<dyn LlmClient>,
    llm_settings: LlmSettings,
    extraction_timeout: Duration,
    kg_batch_size: usize,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn SourceStore>,
        extraction: Arc<dyn ExtractionService>,
        graph_api: Arc<dyn GraphIngestApi>,
        llm: Arc<dyn LlmClient>,
        llm_settings: LlmSettings,
        extraction_timeout: Duration,
        kg_batch_size: usize,
    ) -> Self {
        Self {
            store,
            extraction,
            graph_api,
            llm,
            llm_settings,
            extraction_timeout,
            kg_batch_size,
        }
    }

    pub async fn ingest(&self, new_source: NewSource) -> Result<IngestReceipt, IngestError> {
        let title = new_source.title.trim();
        if title.is_empty() {
            return Err(IngestError::EmptyTitle);
        }

        // Duplicate titles are rejected before any extraction work, so a
        // rejected request leaves no partial state behind.
        if self
            .store
            .find_by_title(&new_source.owner_id, title)
            .await?
            .is_some()
        {
            return Err(IngestError::DuplicateTitle(title.to_string()));
        }

        let record = SourceRecord::new(
            &new_source.owner_id,
            title,
            new_source.source_type,
            &new_source.origin,
        );
        let source_id = record.id.clone();
        self.store.insert(record).await?;

        let request = ExtractionRequest {
            origin: new_source.origin.clone(),
            source_type: new_source.source_type,
            owner_id: new_source.owner_id.clone(),
        };

        let outcome = match tokio::time::timeout(
            self.extraction_timeout,
            self.extraction.extract(&request),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => return self.fail_extraction(&source_id, err.to_string()).await,
            Err(_) => {
                let reason = format!(
                    "extraction timed out after {}s",
                    self.extraction_timeout.as_secs()
                );
                return self.fail_extraction(&source_id, reason).await;
            }
        };

        if !outcome.status_ok() {
            let reason = format!("extraction service returned status '{}'", outcome.status);
            return self.fail_extraction(&source_id, reason).await;
        }
        if !outcome.has_text() {
            return self
                .fail_extraction(&source_id, "extraction returned no text".to_string())
                .await;
        }

        self.store
            .set_text_content(&source_id, &outcome.extracted_text)
            .await?;
        self.store
            .advance_status(&source_id, SourceStatus::ProcessingAnalysis)
            .await?;

        let analysis_job = AnalysisJob {
            source_id: source_id.clone(),
            text: outcome.extracted_text,
            credential_present: self.llm_settings.has_credential(),
            artifact_timeout: self.llm_settings.artifact_timeout,
            max_output_tokens: self.llm_settings.max_output_tokens,
        };
        tokio::spawn(analysis::run(
            analysis_job,
            self.store.clone(),
            self.llm.clone(),
        ));

        if outcome.chunks.is_empty() {
            warn!(source_id = %source_id, "extraction returned no chunks; kg worker not dispatched");
        } else {
            let kg_job = KgJob {
                source_id: source_id.clone(),
                owner_id: new_source.owner_id,
                document_title: title.to_string(),
                chunks: outcome.chunks,
                batch_size: self.kg_batch_size,
                max_output_tokens: self.llm_settings.max_output_tokens,
            };
            tokio::spawn(kg::run(
                kg_job,
                self.store.clone(),
                self.llm.clone(),
                self.graph_api.clone(),
            ));
        }

        info!(source_id = %source_id, "source accepted; background workers dispatched");
        Ok(IngestReceipt {
            id: source_id,
            status: SourceStatus::ProcessingAnalysis,
        })
    }

    async fn fail_extraction(
        &self,
        source_id: &str,
        reason: String,
    ) -> Result<IngestReceipt, IngestError> {
        self.store.mark_failed(source_id, &reason).await?;
        Err(IngestError::Extraction(reason))
    }
}
