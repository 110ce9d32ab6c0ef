use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod io;
pub mod json_source_store;

pub use json_source_store::{JsonSourceStore, JsonSourceStoreConfig};

pub type StorageResult<T> = Result<T>;

/// Lifecycle of the document as a whole. Moves only forward, except that
/// any state may fall into `Failed`.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    #[default]
    ProcessingExtraction,
    ProcessingAnalysis,
    Completed,
    Failed,
}

impl SourceStatus {
    fn rank(self) -> u8 {
        match self {
            Self::ProcessingExtraction => 0,
            Self::ProcessingAnalysis => 1,
            Self::Completed => 2,
            Self::Failed => 3,
        }
    }

    pub fn can_advance_to(self, next: SourceStatus) -> bool {
        if self == Self::Failed {
            return false;
        }
        next == Self::Failed || next.rank() > self.rank()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Independent state machine for the knowledge-graph side of the pipeline.
/// Evolves concurrently with [`SourceStatus`] and never affects it.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KgStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    SkippedNoChunks,
    FailedExtraction,
    FailedCritical,
}

impl KgStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Processing)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Document,
    Webpage,
    Video,
    Audio,
    Image,
}

/// The three study artifacts derived from the extracted text.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub faq: Option<String>,
    #[serde(default)]
    pub topics: Option<String>,
    #[serde(default)]
    pub mindmap: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub owner_id: String,
    pub source_type: SourceType,
    pub title: String,
    pub origin: String,
    pub status: SourceStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub analysis: Analysis,
    #[serde(default)]
    pub kg_status: KgStatus,
    #[serde(default)]
    pub kg_status_message: Option<String>,
    #[serde(default)]
    pub kg_node_count: Option<usize>,
    #[serde(default)]
    pub kg_edge_count: Option<usize>,
    pub created_at: String,
    pub updated_at: String,
}

impl SourceRecord {
    pub fn new(owner_id: &str, title: &str, source_type: SourceType, origin: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            source_type,
            title: title.to_string(),
            origin: origin.to_string(),
            status: SourceStatus::ProcessingExtraction,
            failure_reason: None,
            text_content: None,
            analysis: Analysis::default(),
            kg_status: KgStatus::Pending,
            kg_status_message: None,
            kg_node_count: None,
            kg_edge_count: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Shared persistent store for source records. This is the only channel the
/// coordinator and the background workers communicate through; every mutation
/// is a single field-level update under one lock acquisition, persisted before
/// the call returns, so pollers never observe a torn state.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn initialize(&self) -> StorageResult<()>;
    async fn finalize(&self) -> StorageResult<()>;

    async fn insert(&self, record: SourceRecord) -> StorageResult<()>;
    async fn get(&self, id: &str) -> StorageResult<Option<SourceRecord>>;
    async fn find_by_title(
        &self,
        owner_id: &str,
        title: &str,
    ) -> StorageResult<Option<SourceRecord>>;
    async fn list(&self) -> StorageResult<Vec<SourceRecord>>;

    async fn set_text_content(&self, id: &str, text: &str) -> StorageResult<()>;

    /// Advance the document lifecycle. Backward transitions are rejected.
    async fn advance_status(&self, id: &str, next: SourceStatus) -> StorageResult<()>;
    async fn mark_failed(&self, id: &str, reason: &str) -> StorageResult<()>;

    /// Store the three artifacts and complete the record. `advisory` carries
    /// the non-fatal note when some artifact could not be generated.
    async fn set_analysis(
        &self,
        id: &str,
        analysis: Analysis,
        advisory: Option<String>,
    ) -> StorageResult<()>;

    async fn set_kg_status(
        &self,
        id: &str,
        status: KgStatus,
        message: Option<String>,
    ) -> StorageResult<()>;
    async fn set_kg_counts(&self, id: &str, nodes: usize, edges: usize) -> StorageResult<()>;

    async fn sync_if_dirty(&self) -> StorageResult<()>;
}
