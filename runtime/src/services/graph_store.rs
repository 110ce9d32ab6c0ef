use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::pipeline::types::{GraphEdge, GraphNode, MergedGraph};

/// The single status literal the ingestion API returns on success. Anything
/// else, even on a 2xx response, is a failed ingestion.
pub const GRAPH_INGEST_SUCCESS: &str = "success";

#[derive(Debug, Serialize)]
struct GraphIngestRequest<'a> {
    owner_id: &'a str,
    document_title: &'a str,
    nodes: &'a [GraphNode],
    edges: &'a [GraphEdge],
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphIngestReply {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl GraphIngestReply {
    pub fn is_success(&self) -> bool {
        self.status == GRAPH_INGEST_SUCCESS
    }
}

/// Boundary to the external graph store's ingestion API.
#[async_trait]
pub trait GraphIngestApi: Send + Sync {
    async fn ingest(
        &self,
        owner_id: &str,
        document_title: &str,
        graph: &MergedGraph,
    ) -> Result<GraphIngestReply>;
}

pub struct HttpGraphStore {
    http: Client,
    base: String,
}

impl HttpGraphStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("failed to build graph store http client")?;
        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GraphIngestApi for HttpGraphStore {
    async fn ingest(
        &self,
        owner_id: &str,
        document_title: &str,
        graph: &MergedGraph,
    ) -> Result<GraphIngestReply> {
        let request = GraphIngestRequest {
            owner_id,
            document_title,
            nodes: &graph.nodes,
            edges: &graph.edges,
        };

        let resp = self
            .http
            .post(format!("{}/graphs/ingest", self.base))
            .json(&request)
            .send()
            .await
            .context("graph store unreachable")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("graph store returned {status}: {body}");
        }

        resp.json::<GraphIngestReply>()
            .await
            .context("failed to decode graph store response")
    }
}
