use chrono::Utc;
use libsql::{params, Connection, Row};
use uuid::Uuid;

use crate::error::{Result, SunsteadError};
use crate::models::{Message, MessageRole, NewMessage, Session, SessionSummary};

use super::parse_ts;

pub struct ConversationRepository;

impl ConversationRepository {
    pub async fn create_session(conn: &Connection) -> Result<Session> {
        let session = Session {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO agent_sessions (id, created_at, updated_at) VALUES (?1, ?2, ?3)",
            params![
                session.id.to_string(),
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(session)
    }

    pub async fn get_session(conn: &Connection, id: Uuid) -> Result<Option<Session>> {
        let mut rows = conn
            .query(
                "SELECT id, created_at, updated_at FROM agent_sessions WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Session {
                id: parse_uuid(&row.get::<String>(0)?)?,
                created_at: parse_ts(&row.get::<String>(1)?)?,
                updated_at: parse_ts(&row.get::<String>(2)?)?,
            })),
            None => Ok(None),
        }
    }

    /// Append one message and bump the session's `updated_at`. `created_at`
    /// is assigned here so within-session order follows processing order.
    pub async fn append_message(conn: &Connection, message: &NewMessage) -> Result<i64> {
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO agent_messages (
                session_id, role, content, agent_used, agent_role, duration_ms, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                message.session_id.to_string(),
                message.role.as_str(),
                message.content.clone(),
                message.agent_used.clone(),
                message.agent_role.clone(),
                message.duration_ms,
                now.clone(),
            ],
        )
        .await?;

        conn.execute(
            "UPDATE agent_sessions SET updated_at = ?2 WHERE id = ?1",
            params![message.session_id.to_string(), now],
        )
        .await?;

        let mut rows = conn.query("SELECT last_insert_rowid()", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Err(SunsteadError::Internal("Failed to read message id".into())),
        }
    }

    /// Last `limit` messages in chronological order.
    pub async fn recent_messages(
        conn: &Connection,
        session_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let mut rows = conn
            .query(
                &format!("{SELECT_MESSAGE} WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2"),
                params![session_id.to_string(), limit],
            )
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(row_to_message(&row)?);
        }
        messages.reverse();
        Ok(messages)
    }

    pub async fn session_messages(conn: &Connection, session_id: Uuid) -> Result<Vec<Message>> {
        let mut rows = conn
            .query(
                &format!("{SELECT_MESSAGE} WHERE session_id = ?1 ORDER BY id"),
                params![session_id.to_string()],
            )
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(row_to_message(&row)?);
        }
        Ok(messages)
    }

    pub async fn list_sessions(conn: &Connection, limit: u32) -> Result<Vec<SessionSummary>> {
        let mut rows = conn
            .query(
                r#"
                SELECT s.id, s.created_at, s.updated_at,
                       (SELECT COUNT(*) FROM agent_messages m WHERE m.session_id = s.id)
                FROM agent_sessions s
                ORDER BY s.updated_at DESC
                LIMIT ?1
                "#,
                params![limit],
            )
            .await?;

        let mut sessions = Vec::new();
        while let Some(row) = rows.next().await? {
            sessions.push(SessionSummary {
                id: parse_uuid(&row.get::<String>(0)?)?,
                created_at: parse_ts(&row.get::<String>(1)?)?,
                updated_at: parse_ts(&row.get::<String>(2)?)?,
                message_count: row.get::<i64>(3)?,
            });
        }
        Ok(sessions)
    }
}

const SELECT_MESSAGE: &str = r#"
    SELECT id, session_id, role, content, agent_used, agent_role, duration_ms, created_at
    FROM agent_messages
"#;

fn row_to_message(row: &Row) -> Result<Message> {
    let role_raw = row.get::<String>(2)?;
    Ok(Message {
        id: row.get::<i64>(0)?,
        session_id: parse_uuid(&row.get::<String>(1)?)?,
        role: MessageRole::parse(&role_raw)
            .ok_or_else(|| SunsteadError::Internal(format!("Unknown message role '{role_raw}'")))?,
        content: row.get::<String>(3)?,
        agent_used: row.get::<Option<String>>(4)?,
        agent_role: row.get::<Option<String>>(5)?,
        duration_ms: row.get::<Option<i64>>(6)?,
        created_at: parse_ts(&row.get::<String>(7)?)?,
    })
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| SunsteadError::Internal(format!("Invalid stored session id '{raw}': {e}")))
}
