use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::traits::HealthSnapshot;
use crate::models::{
    DocumentSummary, KbSearchHit, Message, QueryType, Session, SessionSummary, SyncRun,
};
use crate::quota::QuotaUsage;

// ---------------------------------------------------------------------------
// /ask
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 8000))]
    pub message: String,
    /// Prior session to continue. Malformed or unknown ids are silently
    /// replaced with a fresh session.
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AskResponse {
    pub response: String,
    pub session_id: Uuid,
    pub agent_role: String,
    pub duration_ms: i64,
    pub context_tokens: i64,
    pub cache_hit: bool,
    pub query_type: QueryType,
}

// ---------------------------------------------------------------------------
// /kb
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct SyncQuery {
    /// `true` forces a full re-sync; the default is incremental.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct KbSearchRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct KbSearchResponse {
    pub results: Vec<KbSearchHit>,
    pub timing_ms: u64,
}

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct DocumentsQuery {
    /// Restrict to documents under this folder prefix.
    pub folder: Option<String>,
    /// Only tier-1 context files.
    #[serde(default)]
    pub context_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SyncStatusResponse {
    pub latest: Option<SyncRun>,
}

// ---------------------------------------------------------------------------
// /energy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct StatsQuery {
    /// Window in hours, clamped to 1..=168.
    pub hours: Option<i64>,
}

// ---------------------------------------------------------------------------
// /conversations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct ConversationsQuery {
    /// Sessions to return, clamped to 1..=100. Defaults to 20.
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConversationsResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConversationDetailResponse {
    pub session: Session,
    pub messages: Vec<Message>,
}

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub db_ok: bool,
    pub cache_enabled: bool,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MonitoringStatusResponse {
    /// Last persisted snapshot from the health monitor loop.
    #[schema(value_type = Object)]
    pub snapshot: Option<HealthSnapshot>,
    pub quotas: Vec<NamedQuota>,
    pub latest_sync: Option<SyncRun>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct NamedQuota {
    pub name: String,
    #[schema(value_type = Object)]
    pub usage: QuotaUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_request_accepts_minimal_body() {
        let req: AskRequest = serde_json::from_str(r#"{"message": "hello"}"#).unwrap();
        assert_eq!(req.message, "hello");
        assert!(req.session_id.is_none());
        assert!(req.user_id.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn ask_request_rejects_empty_message() {
        let req: AskRequest = serde_json::from_str(r#"{"message": ""}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn ask_response_wire_shape() {
        let resp = AskResponse {
            response: "27%".into(),
            session_id: Uuid::nil(),
            agent_role: "Solar Controller".into(),
            duration_ms: 812,
            context_tokens: 1400,
            cache_hit: false,
            query_type: QueryType::System,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["query_type"], "system");
        assert_eq!(json["cache_hit"], false);
        assert_eq!(json["duration_ms"], 812);
    }

    #[test]
    fn sync_query_force_defaults_false() {
        let q: SyncQuery = serde_json::from_str("{}").unwrap();
        assert!(!q.force);
    }
}
