use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::ai::{GenerateOptions, LlmClient};
use crate::storage::{Analysis, SourceStore};

pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "Error: Analysis failed because no valid API key was provided.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Faq,
    Topics,
    Mindmap,
}

impl ArtifactKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Faq => "FAQ",
            Self::Topics => "topic summary",
            Self::Mindmap => "concept map script",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            Self::Faq => {
                "You are a study assistant. Write a FAQ for the supplied document: \
                 the questions a reader is most likely to ask, each with a concise \
                 answer grounded in the text."
            }
            Self::Topics => {
                "You are a study assistant. Produce a topic summary of the supplied \
                 document: the major topics it covers, one short paragraph each."
            }
            Self::Mindmap => {
                "You are a study assistant. Write a concept map script for the \
                 supplied document in mermaid mindmap syntax, one root with the \
                 document's key concepts as branches."
            }
        }
    }
}

/// Everything the analysis worker needs, as plain data. The worker shares
/// nothing with the coordinator but the source store.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub source_id: String,
    pub text: String,
    pub credential_present: bool,
    pub artifact_timeout: Duration,
    pub max_output_tokens: u32,
}

/// Background analysis worker: derives the three study artifacts from the
/// extracted text. Per-artifact failures degrade the output; only an error
/// escaping `run_inner` fails the whole record.
pub async fn run(job: AnalysisJob, store: Arc<dyn SourceStore>, llm: Arc<dyn LlmClient>) {
    let source_id = job.source_id.clone();
    if let Err(err) = run_inner(job, store.as_ref(), llm.as_ref()).await {
        error!(source_id = %source_id, error = %err, "analysis worker failed");
        if let Err(mark_err) = store.mark_failed(&source_id, &err.to_string()).await {
            error!(source_id = %source_id, error = %mark_err, "failed to record analysis failure");
        }
    }
    if let Err(err) = store.sync_if_dirty().await {
        warn!(source_id = %source_id, error = %err, "failed to flush source store");
    }
}

async fn run_inner(job: AnalysisJob, store: &dyn SourceStore, llm: &dyn LlmClient) -> Result<()> {
    if !job.credential_present {
        warn!(source_id = %job.source_id, "no API key configured; analysis degraded");
        let analysis = Analysis {
            faq: Some(MISSING_CREDENTIAL_MESSAGE.to_string()),
            topics: Some(MISSING_CREDENTIAL_MESSAGE.to_string()),
            mindmap: Some(MISSING_CREDENTIAL_MESSAGE.to_string()),
        };
        return store
            .set_analysis(
                &job.source_id,
                analysis,
                Some("analysis degraded: no API key was configured".to_string()),
            )
            .await;
    }

    // No data dependency between the three artifacts; issue them together.
    // The per-call timeout keeps a hung call from blocking the others.
    let (faq, topics, mindmap) = tokio::join!(
        generate_artifact(llm, ArtifactKind::Faq, &job),
        generate_artifact(llm, ArtifactKind::Topics, &job),
        generate_artifact(llm, ArtifactKind::Mindmap, &job),
    );

    let failures = [&faq, &topics, &mindmap]
        .into_iter()
        .filter(|outcome| outcome.failed)
        .count();

    let advisory = (failures > 0).then(|| {
        format!(
            "{failures} of 3 study artifacts could not be generated; \
             the document text is still available"
        )
    });

    let analysis = Analysis {
        faq: Some(faq.text),
        topics: Some(topics.text),
        mindmap: Some(mindmap.text),
    };

    info!(source_id = %job.source_id, failures, "analysis complete");
    store.set_analysis(&job.source_id, analysis, advisory).await
}

struct ArtifactOutcome {
    text: String,
    failed: bool,
}

async fn generate_artifact(
    llm: &dyn LlmClient,
    kind: ArtifactKind,
    job: &AnalysisJob,
) -> ArtifactOutcome {
    let options = GenerateOptions {
        max_output_tokens: Some(job.max_output_tokens),
    };
    let call = llm.generate(&[], &job.text, kind.system_prompt(), &options);

    match tokio::time::timeout(job.artifact_timeout, call).await {
        Ok(Ok(text)) => ArtifactOutcome { text, failed: false },
        Ok(Err(err)) => {
            warn!(source_id = %job.source_id, artifact = kind.label(), error = %err,
                "artifact generation failed");
            ArtifactOutcome {
                text: format!("Error generating {}: {err}", kind.label()),
                failed: true,
            }
        }
        Err(_) => {
            warn!(source_id = %job.source_id, artifact = kind.label(),
                timeout_secs = job.artifact_timeout.as_secs(), "artifact generation timed out");
            ArtifactOutcome {
                text: format!(
                    "Error generating {}: timed out after {}s",
                    kind.label(),
                    job.artifact_timeout.as_secs()
                ),
                failed: true,
            }
        }
    }
}
