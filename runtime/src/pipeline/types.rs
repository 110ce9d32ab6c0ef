use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A bounded span of extracted text plus metadata from the extraction
/// service. Chunks are the unit of graph extraction and are never persisted
/// individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphNode {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphEdge {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub relationship: String,
}

/// The small node/edge graph one LLM call produces for one chunk.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GraphFragment {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

/// Final deduplicated graph. Only its counts are persisted locally; the
/// graph itself goes to the external graph store.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct MergedGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}
