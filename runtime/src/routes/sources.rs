use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::pipeline::{IngestError, IngestReceipt, NewSource};
use crate::storage::{Analysis, KgStatus, SourceStatus, SourceType};

const DEFAULT_OWNER: &str = "local";

#[derive(Deserialize)]
struct CreateSourceBody {
    title: String,
    source_type: SourceType,
    origin: String,
}

/// Read-only polling view: enough for a caller to track pipeline progress
/// without understanding worker internals.
#[derive(Serialize)]
struct SourceView {
    id: String,
    title: String,
    status: SourceStatus,
    kg_status: KgStatus,
    failure_reason: Option<String>,
    kg_status_message: Option<String>,
    analysis: Analysis,
    kg_node_count: Option<usize>,
    kg_edge_count: Option<usize>,
}

#[derive(Serialize)]
struct SourceSummary {
    id: String,
    title: String,
    status: SourceStatus,
    kg_status: KgStatus,
    created_at: String,
    updated_at: String,
}

#[derive(Serialize)]
struct SourceListResponse {
    total: usize,
    sources: Vec<SourceSummary>,
}

pub fn source_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sources", post(create_source).get(list_sources))
        .route("/sources/{id}", get(source_status))
}

fn owner_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-owner-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|owner| !owner.is_empty())
        .unwrap_or(DEFAULT_OWNER)
        .to_string()
}

async fn create_source(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateSourceBody>,
) -> Result<(StatusCode, Json<IngestReceipt>), (StatusCode, String)> {
    let new_source = NewSource {
        owner_id: owner_from_headers(&headers),
        title: body.title,
        source_type: body.source_type,
        origin: body.origin,
    };

    match state.coordinator.ingest(new_source).await {
        Ok(receipt) => Ok((StatusCode::ACCEPTED, Json(receipt))),
        Err(err @ IngestError::EmptyTitle) => Err((StatusCode::BAD_REQUEST, err.to_string())),
        Err(err @ IngestError::DuplicateTitle(_)) => Err((StatusCode::CONFLICT, err.to_string())),
        Err(err @ IngestError::Extraction(_)) => Err((StatusCode::BAD_GATEWAY, err.to_string())),
        Err(IngestError::Storage(err)) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to persist source: {err}"),
        )),
    }
}

async fn source_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SourceView>, (StatusCode, String)> {
    let record = state
        .store
        .get(&id)
        .await
        .map_err(|err| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to load source: {err}"),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown source: {id}")))?;

    Ok(Json(SourceView {
        id: record.id,
        title: record.title,
        status: record.status,
        kg_status: record.kg_status,
        failure_reason: record.failure_reason,
        kg_status_message: record.kg_status_message,
        analysis: record.analysis,
        kg_node_count: record.kg_node_count,
        kg_edge_count: record.kg_edge_count,
    }))
}

async fn list_sources(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SourceListResponse>, (StatusCode, String)> {
    let records = state.store.list().await.map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to list sources: {err}"),
        )
    })?;

    let sources: Vec<SourceSummary> = records
        .into_iter()
        .map(|record| SourceSummary {
            id: record.id,
            title: record.title,
            status: record.status,
            kg_status: record.kg_status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
        .collect();

    Ok(Json(SourceListResponse {
        total: sources.len(),
        sources,
    }))
}
