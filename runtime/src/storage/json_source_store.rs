use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering as AtomicOrdering},
    },
};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::io::{ensure_parent_dir, load_or_default, write_json_file};
use super::{Analysis, KgStatus, SourceRecord, SourceStatus, SourceStore, StorageResult};

#[derive(Clone, Debug)]
pub struct JsonSourceStoreConfig {
    pub working_dir: PathBuf,
    pub namespace: String,
    pub workspace: Option<String>,
}

/// JSON-file backed [`SourceStore`]. Records live in memory behind an
/// `RwLock`; every mutation marks the store dirty and the whole map is
/// rewritten atomically before the mutating call returns.
pub struct JsonSourceStore {
    final_namespace: String,
    file_path: PathBuf,
    data: Arc<RwLock<HashMap<String, SourceRecord>>>,
    dirty: AtomicBool,
}

impl JsonSourceStore {
    pub fn new(config: JsonSourceStoreConfig) -> Self {
        let JsonSourceStoreConfig {
            working_dir,
            namespace,
            workspace,
        } = config;

        let (workspace_prefix, workspace_dir) = match workspace.as_deref() {
            Some(ws) if !ws.is_empty() => (ws.to_string(), working_dir.join(ws)),
            _ => ("_".to_string(), working_dir.clone()),
        };

        let final_namespace = format!("{}_{}", workspace_prefix, namespace);
        let file_path = workspace_dir.join(format!("sources_{}.json", namespace));

        Self {
            final_namespace,
            file_path,
            data: Arc::new(RwLock::new(HashMap::new())),
            dirty: AtomicBool::new(false),
        }
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, AtomicOrdering::SeqCst);
    }

    /// Apply one field-level mutation under a single write-lock acquisition,
    /// then flush to disk.
    async fn mutate<F>(&self, id: &str, apply: F) -> StorageResult<()>
    where
        F: FnOnce(&mut SourceRecord) -> StorageResult<()>,
    {
        {
            let mut guard = self.data.write().await;
            let record = guard
                .get_mut(id)
                .ok_or_else(|| anyhow!("unknown source record: {id}"))?;
            apply(record)?;
            record.updated_at = chrono::Utc::now().to_rfc3339();
        }
        self.mark_dirty();
        self.sync_if_dirty().await
    }
}

#[async_trait]
impl SourceStore for JsonSourceStore {
    async fn initialize(&self) -> StorageResult<()> {
        ensure_parent_dir(&self.file_path).await?;
        let data: HashMap<String, SourceRecord> = load_or_default(&self.file_path).await?;
        *self.data.write().await = data;
        self.dirty.store(false, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn finalize(&self) -> StorageResult<()> {
        self.sync_if_dirty().await
    }

    async fn insert(&self, record: SourceRecord) -> StorageResult<()> {
        {
            let mut guard = self.data.write().await;
            if guard.contains_key(&record.id) {
                return Err(anyhow!("source record already exists: {}", record.id));
            }
            guard.insert(record.id.clone(), record);
        }
        self.mark_dirty();
        self.sync_if_dirty().await
    }

    async fn get(&self, id: &str) -> StorageResult<Option<SourceRecord>> {
        let guard = self.data.read().await;
        Ok(guard.get(id).cloned())
    }

    async fn find_by_title(
        &self,
        owner_id: &str,
        title: &str,
    ) -> StorageResult<Option<SourceRecord>> {
        let guard = self.data.read().await;
        Ok(guard
            .values()
            .find(|record| record.owner_id == owner_id && record.title == title)
            .cloned())
    }

    async fn list(&self) -> StorageResult<Vec<SourceRecord>> {
        let guard = self.data.read().await;
        let mut records: Vec<SourceRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    async fn set_text_content(&self, id: &str, text: &str) -> StorageResult<()> {
        let text = text.to_string();
        self.mutate(id, move |record| {
            record.text_content = Some(text);
            Ok(())
        })
        .await
    }

    async fn advance_status(&self, id: &str, next: SourceStatus) -> StorageResult<()> {
        self.mutate(id, move |record| {
            if !record.status.can_advance_to(next) {
                return Err(anyhow!(
                    "illegal status transition {:?} -> {:?}",
                    record.status,
                    next
                ));
            }
            record.status = next;
            Ok(())
        })
        .await
    }

    async fn mark_failed(&self, id: &str, reason: &str) -> StorageResult<()> {
        let reason = reason.to_string();
        self.mutate(id, move |record| {
            record.status = SourceStatus::Failed;
            record.failure_reason = Some(reason);
            Ok(())
        })
        .await
    }

    async fn set_analysis(
        &self,
        id: &str,
        analysis: Analysis,
        advisory: Option<String>,
    ) -> StorageResult<()> {
        self.mutate(id, move |record| {
            record.analysis = analysis;
            record.failure_reason = advisory;
            if record.status != SourceStatus::Failed {
                record.status = SourceStatus::Completed;
            }
            Ok(())
        })
        .await
    }

    async fn set_kg_status(
        &self,
        id: &str,
        status: KgStatus,
        message: Option<String>,
    ) -> StorageResult<()> {
        self.mutate(id, move |record| {
            record.kg_status = status;
            record.kg_status_message = message;
            Ok(())
        })
        .await
    }

    async fn set_kg_counts(&self, id: &str, nodes: usize, edges: usize) -> StorageResult<()> {
        self.mutate(id, move |record| {
            record.kg_node_count = Some(nodes);
            record.kg_edge_count = Some(edges);
            Ok(())
        })
        .await
    }

    async fn sync_if_dirty(&self) -> StorageResult<()> {
        if !self.dirty.swap(false, AtomicOrdering::SeqCst) {
            return Ok(());
        }

        let snapshot = {
            let guard = self.data.read().await;
            guard.clone()
        };

        write_json_file(&self.file_path, &snapshot)
            .await
            .with_context(|| format!("failed to write source store {}", self.final_namespace))?;
        Ok(())
    }
}
