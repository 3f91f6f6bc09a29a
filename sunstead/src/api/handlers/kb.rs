use std::convert::Infallible;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::Stream;
use tokio::sync::mpsc;
use validator::Validate;

use crate::api::dto::{
    DocumentsQuery, DocumentsResponse, KbSearchRequest, KbSearchResponse, SyncQuery,
    SyncStatusResponse,
};
use crate::api::AppState;
use crate::error::{Result, SunsteadError};
use crate::models::{DocumentFilter, SyncKind};
use crate::sync::SyncPreview;

/// `POST /kb/sync?force={true|false}`
///
/// Streams tagged progress events; a terminal `completed` or `failed`
/// event closes every run that the client stays around for. Dropping the
/// stream aborts the run at the next file boundary.
#[utoipa::path(
    post,
    path = "/kb/sync",
    tag = "kb",
    params(SyncQuery),
    responses(
        (status = 200, description = "Server-sent progress events, one JSON object per event"),
    )
)]
pub async fn sync(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let kind = if query.force {
        SyncKind::Full
    } else {
        SyncKind::Incremental
    };

    let (tx, mut rx) = mpsc::channel(32);
    let pipeline = state.pipeline.clone();

    tokio::spawn(async move {
        if let Err(e) = pipeline.run(kind, "api", tx).await {
            tracing::warn!(error = %e, "Sync run ended with error");
        }
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            match Event::default().json_data(&event) {
                Ok(sse_event) => yield Ok::<_, Infallible>(sse_event),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode sync event");
                }
            }
            if terminal {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// `POST /kb/preview`
#[utoipa::path(
    post,
    path = "/kb/preview",
    tag = "kb",
    responses(
        (status = 200, description = "Counts and first-level folders", body = SyncPreview),
        (status = 502, description = "Document source unreachable"),
    )
)]
pub async fn preview(State(state): State<AppState>) -> Result<Json<SyncPreview>> {
    let preview = state.pipeline.preview().await?;
    Ok(Json(preview))
}

/// `POST /kb/search`
#[utoipa::path(
    post,
    path = "/kb/search",
    tag = "kb",
    request_body = KbSearchRequest,
    responses(
        (status = 200, description = "Ranked chunks", body = KbSearchResponse),
        (status = 400, description = "Malformed request body"),
    )
)]
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<KbSearchRequest>,
) -> Result<Json<KbSearchResponse>> {
    req.validate()
        .map_err(|e| SunsteadError::Validation(e.to_string()))?;

    let start = Instant::now();
    let limit = req.limit.unwrap_or(5).clamp(1, 20);

    let embedding = state.embeddings.embed_query(&req.query).await?;
    let results = state.db.search_chunks(&embedding, limit, None).await?;

    Ok(Json(KbSearchResponse {
        results,
        timing_ms: start.elapsed().as_millis() as u64,
    }))
}

/// `GET /kb/documents`
#[utoipa::path(
    get,
    path = "/kb/documents",
    tag = "kb",
    params(DocumentsQuery),
    responses(
        (status = 200, description = "Stored documents", body = DocumentsResponse),
    )
)]
pub async fn documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentsQuery>,
) -> Result<Json<DocumentsResponse>> {
    let filter = DocumentFilter {
        folder_prefix: query.folder,
        mime: None,
        context_files_only: query.context_only,
    };

    let documents = state.db.list_documents(&filter).await?;
    let total = documents.len();

    Ok(Json(DocumentsResponse { documents, total }))
}

/// `GET /kb/sync/status`
///
/// The most recent sync run, for collaborators polling after a dropped
/// stream.
#[utoipa::path(
    get,
    path = "/kb/sync/status",
    tag = "kb",
    responses(
        (status = 200, description = "Latest sync run", body = SyncStatusResponse),
    )
)]
pub async fn sync_status(State(state): State<AppState>) -> Result<Json<SyncStatusResponse>> {
    let latest = state.db.latest_sync_run().await?;
    Ok(Json(SyncStatusResponse { latest }))
}
