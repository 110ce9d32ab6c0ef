use studygraph_runtime::storage::{
    Analysis, JsonSourceStore, JsonSourceStoreConfig, KgStatus, SourceRecord, SourceStatus,
    SourceStore, SourceType,
};
use tempfile::TempDir;

fn store_config(dir: &TempDir) -> JsonSourceStoreConfig {
    JsonSourceStoreConfig {
        working_dir: dir.path().into(),
        namespace: "sources".to_string(),
        workspace: None,
    }
}

fn sample_record(title: &str) -> SourceRecord {
    SourceRecord::new("owner-1", title, SourceType::Document, "/tmp/doc.pdf")
}

#[tokio::test]
async fn roundtrip_and_reload_from_disk() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = store_config(&dir);

    let store = JsonSourceStore::new(config.clone());
    store.initialize().await?;

    let record = sample_record("Rust Book");
    let id = record.id.clone();
    store.insert(record).await?;
    store.set_text_content(&id, "chapter one").await?;

    let found = store.find_by_title("owner-1", "Rust Book").await?;
    assert_eq!(found.map(|r| r.id), Some(id.clone()));
    assert!(store.find_by_title("owner-2", "Rust Book").await?.is_none());

    let reopened = JsonSourceStore::new(config);
    reopened.initialize().await?;
    let reloaded = reopened.get(&id).await?.expect("record survives reload");
    assert_eq!(reloaded.text_content.as_deref(), Some("chapter one"));
    assert_eq!(reloaded.status, SourceStatus::ProcessingExtraction);
    assert_eq!(reloaded.kg_status, KgStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn status_only_moves_forward_except_into_failed() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = JsonSourceStore::new(store_config(&dir));
    store.initialize().await?;

    let record = sample_record("Forward Only");
    let id = record.id.clone();
    store.insert(record).await?;

    store
        .advance_status(&id, SourceStatus::ProcessingAnalysis)
        .await?;
    store.advance_status(&id, SourceStatus::Completed).await?;

    // Backward is rejected.
    assert!(
        store
            .advance_status(&id, SourceStatus::ProcessingAnalysis)
            .await
            .is_err()
    );
    assert_eq!(
        store.get(&id).await?.unwrap().status,
        SourceStatus::Completed
    );

    // Failed is reachable from anywhere that is not already failed.
    store.advance_status(&id, SourceStatus::Failed).await?;
    assert!(
        store
            .advance_status(&id, SourceStatus::Completed)
            .await
            .is_err()
    );

    Ok(())
}

#[tokio::test]
async fn kg_status_is_independent_of_document_status() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = JsonSourceStore::new(store_config(&dir));
    store.initialize().await?;

    let record = sample_record("Two Machines");
    let id = record.id.clone();
    store.insert(record).await?;

    store
        .set_kg_status(&id, KgStatus::Processing, None)
        .await?;
    store.mark_failed(&id, "extraction blew up").await?;
    store
        .set_kg_status(
            &id,
            KgStatus::FailedExtraction,
            Some("ingest rejected".to_string()),
        )
        .await?;

    let record = store.get(&id).await?.unwrap();
    assert_eq!(record.status, SourceStatus::Failed);
    assert_eq!(record.failure_reason.as_deref(), Some("extraction blew up"));
    assert_eq!(record.kg_status, KgStatus::FailedExtraction);
    assert_eq!(record.kg_status_message.as_deref(), Some("ingest rejected"));

    Ok(())
}

#[tokio::test]
async fn set_analysis_completes_record_with_optional_advisory() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = JsonSourceStore::new(store_config(&dir));
    store.initialize().await?;

    let record = sample_record("Analyzed");
    let id = record.id.clone();
    store.insert(record).await?;
    store
        .advance_status(&id, SourceStatus::ProcessingAnalysis)
        .await?;

    let analysis = Analysis {
        faq: Some("q and a".to_string()),
        topics: Some("topics".to_string()),
        mindmap: Some("mindmap".to_string()),
    };
    store
        .set_analysis(&id, analysis, Some("1 of 3 study artifacts could not be generated".into()))
        .await?;

    let record = store.get(&id).await?.unwrap();
    assert_eq!(record.status, SourceStatus::Completed);
    assert_eq!(record.analysis.faq.as_deref(), Some("q and a"));
    assert!(record.failure_reason.unwrap().contains("1 of 3"));

    Ok(())
}

#[tokio::test]
async fn duplicate_insert_is_rejected() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = JsonSourceStore::new(store_config(&dir));
    store.initialize().await?;

    let record = sample_record("Once");
    store.insert(record.clone()).await?;
    assert!(store.insert(record).await.is_err());

    Ok(())
}
