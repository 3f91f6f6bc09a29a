use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session listing row with its message count, ordered by recency.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Message {
    pub id: i64,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    /// Specialist that produced an assistant message, if any.
    pub agent_used: Option<String>,
    pub agent_role: Option<String>,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; `created_at` is assigned by the store so ordering within
/// a session follows processing order.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub agent_used: Option<String>,
    pub agent_role: Option<String>,
    pub duration_ms: Option<i64>,
}

impl NewMessage {
    pub fn user(session_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            session_id,
            role: MessageRole::User,
            content: content.into(),
            agent_used: None,
            agent_role: None,
            duration_ms: None,
        }
    }

    pub fn assistant(
        session_id: Uuid,
        content: impl Into<String>,
        agent_role: impl Into<String>,
        duration_ms: i64,
    ) -> Self {
        let agent_role = agent_role.into();
        Self {
            session_id,
            role: MessageRole::Assistant,
            content: content.into(),
            agent_used: Some(agent_role.clone()),
            agent_role: Some(agent_role),
            duration_ms: Some(duration_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrips_through_str() {
        assert_eq!(MessageRole::parse("user"), Some(MessageRole::User));
        assert_eq!(MessageRole::parse("assistant"), Some(MessageRole::Assistant));
        assert_eq!(MessageRole::parse("tool"), None);
    }

    #[test]
    fn assistant_constructor_carries_agent_metadata() {
        let session_id = Uuid::new_v4();
        let msg = NewMessage::assistant(session_id, "27% and climbing", "Solar Controller", 1200);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.agent_role.as_deref(), Some("Solar Controller"));
        assert_eq!(msg.duration_ms, Some(1200));
    }
}
