use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::api::dto::{ConversationDetailResponse, ConversationsQuery, ConversationsResponse};
use crate::api::AppState;
use crate::error::{Result, SunsteadError};

/// `GET /conversations?limit=N`
#[utoipa::path(
    get,
    path = "/conversations",
    tag = "conversations",
    params(ConversationsQuery),
    responses(
        (status = 200, description = "Recent sessions, newest first", body = ConversationsResponse),
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ConversationsQuery>,
) -> Result<Json<ConversationsResponse>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let sessions = state.db.list_sessions(limit).await?;
    Ok(Json(ConversationsResponse { sessions }))
}

/// `GET /conversations/{id}`
///
/// Unlike `/ask`, this is a plain read API: an invalid id is a 400 and an
/// unknown one a 404.
#[utoipa::path(
    get,
    path = "/conversations/{id}",
    tag = "conversations",
    params(("id" = String, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Session with its full message array", body = ConversationDetailResponse),
        (status = 400, description = "Malformed session id"),
        (status = 404, description = "Unknown session"),
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetailResponse>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| SunsteadError::Validation(format!("Invalid session id '{id}'")))?;

    let session = state
        .db
        .get_session(id)
        .await?
        .ok_or_else(|| SunsteadError::NotFound(format!("Session {id} not found")))?;

    let messages = state.db.session_messages(id).await?;

    Ok(Json(ConversationDetailResponse { session, messages }))
}
