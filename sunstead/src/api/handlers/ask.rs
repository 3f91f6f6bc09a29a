use axum::{extract::State, Json};
use validator::Validate;

use crate::api::dto::{AskRequest, AskResponse};
use crate::api::AppState;
use crate::error::{Result, SunsteadError};

/// `POST /ask`
///
/// The single query endpoint. Routing, context assembly, and persistence
/// all happen behind the manager; only input validation can produce a
/// non-200 here.
#[utoipa::path(
    post,
    path = "/ask",
    tag = "query",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer with routing telemetry", body = AskResponse),
        (status = 400, description = "Malformed request body"),
    )
)]
pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    req.validate()
        .map_err(|e| SunsteadError::Validation(e.to_string()))?;

    let outcome = state
        .manager
        .handle(
            &req.message,
            req.session_id.as_deref(),
            req.user_id.as_deref(),
        )
        .await;

    Ok(Json(AskResponse {
        response: outcome.response,
        session_id: outcome.session_id,
        agent_role: outcome.agent_role,
        duration_ms: outcome.duration_ms,
        context_tokens: outcome.context_tokens,
        cache_hit: outcome.cache_hit,
        query_type: outcome.query_type,
    }))
}
