use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::ai::{GenerateOptions, LlmClient};
use crate::services::GraphIngestApi;
use crate::storage::{KgStatus, SourceStore};

use super::merge::merge_fragments;
use super::parse::parse_json_lenient;
use super::types::{GraphFragment, TextChunk};

const GRAPH_SYSTEM_PROMPT: &str = "You extract knowledge graphs from text. For every passage you \
     are given, produce one JSON object of the form {\"nodes\": [{\"id\", \"type\", \"parent\", \
     \"description\"}], \"edges\": [{\"from\", \"to\", \"relationship\"}]}. Reply with a single \
     JSON array containing these objects in the same order as the passages, and nothing else.";

#[derive(Debug, Clone)]
pub struct KgJob {
    pub source_id: String,
    pub owner_id: String,
    pub document_title: String,
    pub chunks: Vec<TextChunk>,
    pub batch_size: usize,
    pub max_output_tokens: u32,
}

/// Background knowledge-graph worker: batches the chunk list, extracts one
/// graph fragment per chunk, merges the fragments and ships the result to
/// the graph store. Nothing in here touches the parent document's `status`;
/// the worker only ever writes `kg_status`.
pub async fn run(
    job: KgJob,
    store: Arc<dyn SourceStore>,
    llm: Arc<dyn LlmClient>,
    graph_api: Arc<dyn GraphIngestApi>,
) {
    let source_id = job.source_id.clone();
    if let Err(err) = run_inner(job, store.as_ref(), llm.as_ref(), graph_api.as_ref()).await {
        error!(source_id = %source_id, error = %err, "knowledge-graph worker failed");
        if let Err(mark_err) = store
            .set_kg_status(&source_id, KgStatus::FailedCritical, Some(err.to_string()))
            .await
        {
            error!(source_id = %source_id, error = %mark_err,
                "failed to record critical kg failure");
        }
    }
    if let Err(err) = store.sync_if_dirty().await {
        warn!(source_id = %source_id, error = %err, "failed to flush source store");
    }
}

async fn run_inner(
    job: KgJob,
    store: &dyn SourceStore,
    llm: &dyn LlmClient,
    graph_api: &dyn GraphIngestApi,
) -> Result<()> {
    store
        .set_kg_status(&job.source_id, KgStatus::Processing, None)
        .await?;

    if job.chunks.is_empty() {
        info!(source_id = %job.source_id, "no chunks to extract; skipping knowledge graph");
        return store
            .set_kg_status(
                &job.source_id,
                KgStatus::SkippedNoChunks,
                Some("extraction produced no text chunks".to_string()),
            )
            .await;
    }

    let batch_size = job.batch_size.max(1);
    let total_batches = job.chunks.len().div_ceil(batch_size);
    let mut fragments: Vec<GraphFragment> = Vec::with_capacity(job.chunks.len());

    // Batches run strictly sequentially to stay under the provider's rate
    // limits; the merge below does not depend on batch order.
    for (index, batch) in job.chunks.chunks(batch_size).enumerate() {
        match extract_batch(llm, batch, job.max_output_tokens).await {
            Ok(mut batch_fragments) => {
                if batch_fragments.len() != batch.len() {
                    warn!(source_id = %job.source_id, batch = index + 1,
                        expected = batch.len(), received = batch_fragments.len(),
                        "fragment count does not match batch size");
                }
                fragments.append(&mut batch_fragments);
            }
            Err(err) => {
                warn!(source_id = %job.source_id, batch = index + 1, total_batches,
                    error = %err, "batch failed; continuing with remaining batches");
            }
        }
    }

    let graph = merge_fragments(&fragments);
    if graph.nodes.is_empty() {
        info!(source_id = %job.source_id, "merged graph is empty");
        return store
            .set_kg_status(
                &job.source_id,
                KgStatus::Completed,
                Some("graph extraction produced an empty graph".to_string()),
            )
            .await;
    }

    match graph_api
        .ingest(&job.owner_id, &job.document_title, &graph)
        .await
    {
        Ok(reply) if reply.is_success() => {
            info!(source_id = %job.source_id, nodes = graph.nodes.len(),
                edges = graph.edges.len(), "knowledge graph ingested");
            store
                .set_kg_counts(&job.source_id, graph.nodes.len(), graph.edges.len())
                .await?;
            store
                .set_kg_status(&job.source_id, KgStatus::Completed, reply.message)
                .await
        }
        Ok(reply) => {
            let message = reply
                .message
                .unwrap_or_else(|| format!("graph store returned status '{}'", reply.status));
            store
                .set_kg_status(&job.source_id, KgStatus::FailedExtraction, Some(message))
                .await
        }
        Err(err) => {
            store
                .set_kg_status(
                    &job.source_id,
                    KgStatus::FailedExtraction,
                    Some(err.to_string()),
                )
                .await
        }
    }
}

/// One LLM call for one batch. Returns only the reply elements that look
/// like fragments; everything else is logged and dropped.
async fn extract_batch(
    llm: &dyn LlmClient,
    batch: &[TextChunk],
    max_output_tokens: u32,
) -> Result<Vec<GraphFragment>> {
    let options = GenerateOptions {
        max_output_tokens: Some(max_output_tokens),
    };
    let reply = llm
        .generate(&[], &batch_prompt(batch), GRAPH_SYSTEM_PROMPT, &options)
        .await?;

    let value =
        parse_json_lenient(&reply).ok_or_else(|| anyhow!("model reply is not parseable JSON"))?;
    let Value::Array(items) = value else {
        bail!("model reply is not a JSON array");
    };

    let mut fragments = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match fragment_from_value(item) {
            Some(fragment) => fragments.push(fragment),
            None => warn!(element = index, "discarding reply element without nodes/edges arrays"),
        }
    }
    Ok(fragments)
}

fn fragment_from_value(value: Value) -> Option<GraphFragment> {
    let shaped = value.get("nodes").is_some_and(Value::is_array)
        && value.get("edges").is_some_and(Value::is_array);
    if !shaped {
        return None;
    }
    serde_json::from_value(value).ok()
}

fn batch_prompt(batch: &[TextChunk]) -> String {
    let mut prompt = format!(
        "Extract a knowledge graph fragment from each of the {} passages below.\n",
        batch.len()
    );
    for (index, chunk) in batch.iter().enumerate() {
        let _ = write!(prompt, "\n--- Passage {} ---\n{}\n", index + 1, chunk.text);
    }
    prompt
}
