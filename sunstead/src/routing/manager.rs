use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::agents::{AgentRole, KbDirect, Reasoner, ReasonerOutput};
use crate::config::AgentsConfig;
use crate::context::ContextManager;
use crate::db::DatabaseBackend;
use crate::models::{ContextBundle, NewMessage, QueryType};
use crate::tools::ToolRegistry;

/// Built-in fast-path vocabulary. Any hit skips classification and assembly
/// and answers straight from the knowledge base. Extendable through
/// `SUNSTEAD_FASTPATH_KEYWORDS`; meta queries ("what is the system") carry
/// none of these and route to the manager instead.
const FASTPATH_KEYWORDS: &[&str] = &[
    "specs",
    "specification",
    "threshold",
    "policy",
    "procedure",
    "manual",
    "how do i",
    "documentation",
];

/// Everything the query endpoint needs to answer and log one turn.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub response: String,
    pub session_id: Uuid,
    pub agent_role: String,
    pub duration_ms: i64,
    pub context_tokens: i64,
    pub cache_hit: bool,
    pub query_type: QueryType,
    pub capped: bool,
}

/// The router: resolves the session, short-circuits documentation lookups,
/// delegates everything else to exactly one specialist, and persists the
/// turn. Failures downstream of input validation degrade to a populated
/// response; they never surface as 5xx.
pub struct Manager {
    db: Arc<dyn DatabaseBackend>,
    context: ContextManager,
    reasoner: Reasoner,
    kb_direct: KbDirect,
    registry: ToolRegistry,
    config: AgentsConfig,
}

impl Manager {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        context: ContextManager,
        reasoner: Reasoner,
        kb_direct: KbDirect,
        registry: ToolRegistry,
        config: AgentsConfig,
    ) -> Self {
        Self {
            db,
            context,
            reasoner,
            kb_direct,
            registry,
            config,
        }
    }

    pub async fn handle(
        &self,
        message: &str,
        session_id: Option<&str>,
        user_id: Option<&str>,
    ) -> QueryOutcome {
        let start = Instant::now();
        let user_id = user_id.unwrap_or("default");

        let session_id = self.resolve_session(session_id).await;

        let mut outcome = if let Some(keyword) = self.fastpath_keyword(message) {
            tracing::info!(keyword, "Fast-path documentation lookup");
            self.answer_fastpath(message, session_id).await
        } else {
            self.answer_routed(message, session_id, user_id).await
        };

        outcome.duration_ms = start.elapsed().as_millis() as i64;
        self.persist_turn(session_id, message, &outcome).await;

        tracing::info!(
            session_id = %session_id,
            agent_role = %outcome.agent_role,
            query_type = outcome.query_type.as_str(),
            duration_ms = outcome.duration_ms,
            context_tokens = outcome.context_tokens,
            cache_hit = outcome.cache_hit,
            capped = outcome.capped,
            "Query handled"
        );

        outcome
    }

    /// Resolve or silently replace the supplied session id. An invalid or
    /// unknown id never propagates; it degrades to a fresh session with no
    /// blocking lookup beyond one indexed read.
    async fn resolve_session(&self, supplied: Option<&str>) -> Uuid {
        if let Some(raw) = supplied {
            if let Ok(id) = Uuid::parse_str(raw) {
                match self.db.get_session(id).await {
                    Ok(Some(session)) => return session.id,
                    Ok(None) => {
                        tracing::debug!(supplied = %raw, "Unknown session id; creating new session");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Session lookup failed; creating new session");
                    }
                }
            } else {
                tracing::debug!(supplied = %raw, "Invalid session id; creating new session");
            }
        }

        match self.db.create_session().await {
            Ok(session) => session.id,
            Err(e) => {
                // Persistence trouble must not fail the query; hand out an
                // ephemeral id and let message writes log their own errors.
                tracing::error!(error = %e, "Session creation failed; using ephemeral session");
                Uuid::new_v4()
            }
        }
    }

    fn fastpath_keyword(&self, message: &str) -> Option<String> {
        let normalized = message.to_lowercase();
        FASTPATH_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .chain(self.config.extra_fastpath_keywords.iter().cloned())
            .find(|keyword| normalized.contains(keyword.as_str()))
    }

    async fn answer_fastpath(&self, message: &str, session_id: Uuid) -> QueryOutcome {
        // Classification is skipped for routing; run it anyway for the
        // telemetry field since it is pure and cheap.
        let classification = super::classify(message);

        let response = match self.kb_direct.answer(message).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "KB-direct lookup failed");
                "Documentation search is unavailable right now; the knowledge base could not \
                 be reached."
                    .to_string()
            }
        };

        QueryOutcome {
            response,
            session_id,
            agent_role: AgentRole::KbDirect.display_name().to_string(),
            duration_ms: 0,
            context_tokens: 0,
            cache_hit: false,
            query_type: classification.query_type,
            capped: false,
        }
    }

    async fn answer_routed(&self, message: &str, session_id: Uuid, user_id: &str) -> QueryOutcome {
        let (bundle, _classification) = match self
            .context
            .assemble(user_id, Some(session_id), message)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                // Assembly failure degrades to GENERAL with an empty bundle.
                tracing::warn!(error = %e, "Context assembly failed; degrading to general");
                let mut bundle = ContextBundle::empty(QueryType::General);
                bundle.degraded_sources.push("assembly".to_string());
                (bundle, super::classify(""))
            }
        };

        let query_type = bundle.query_type;
        let cache_hit = bundle.from_cache;
        let context_tokens = bundle.total_tokens;
        let rendered = bundle.render();

        let role = match query_type {
            QueryType::Research => AgentRole::Research,
            QueryType::Planning => AgentRole::EnergyOrchestrator,
            QueryType::System => AgentRole::SolarController,
            QueryType::General => AgentRole::Manager,
        };

        let (response, agent_role, capped) = self
            .run_reasoner(role, &rendered, message)
            .await;

        QueryOutcome {
            response,
            session_id,
            agent_role,
            duration_ms: 0,
            context_tokens,
            cache_hit,
            query_type,
            capped,
        }
    }

    /// Run the selected role bounded by its iteration cap and a wall-clock
    /// timeout. Every failure path returns a populated response.
    async fn run_reasoner(
        &self,
        role: AgentRole,
        context: &str,
        query: &str,
    ) -> (String, String, bool) {
        let max_iterations = match role {
            AgentRole::Manager => self.config.manager_max_iterations,
            _ => self.config.max_iterations,
        };
        let tools = self.registry.subset(role.permitted_tools());
        let timeout = Duration::from_secs(self.config.reasoner_timeout_secs);

        let run = self
            .reasoner
            .run(role, &tools, context, query, max_iterations);

        match tokio::time::timeout(timeout, run).await {
            Ok(Ok(ReasonerOutput {
                answer, capped, ..
            })) => (answer, role.display_name().to_string(), capped),
            Ok(Err(e)) => {
                tracing::warn!(role = role.display_name(), error = %e, "Reasoner failed");
                (
                    self.fallback_answer(role),
                    AgentRole::Manager.display_name().to_string(),
                    false,
                )
            }
            Err(_) => {
                tracing::warn!(role = role.display_name(), "Reasoner timed out");
                (
                    "Sorry — that took longer than I allow for a single answer. Please try \
                     again, or ask something more specific."
                        .to_string(),
                    AgentRole::Manager.display_name().to_string(),
                    false,
                )
            }
        }
    }

    fn fallback_answer(&self, role: AgentRole) -> String {
        match role {
            AgentRole::Manager => {
                "Hello! Could you tell me a bit more about what you'd like to know? I can \
                 report system status, plan energy use, or look things up in the ranch \
                 documentation."
                    .to_string()
            }
            _ => "Sorry — I couldn't complete that request right now. The reasoning service \
                  is unavailable; system data and documentation search still work."
                .to_string(),
        }
    }

    /// Persist both sides of the turn. Write failures are logged and
    /// swallowed; the client never sees a 5xx for them.
    async fn persist_turn(&self, session_id: Uuid, message: &str, outcome: &QueryOutcome) {
        if let Err(e) = self
            .db
            .append_message(&NewMessage::user(session_id, message))
            .await
        {
            tracing::error!(error = %e, session_id = %session_id, "Failed to persist user message");
        }

        if let Err(e) = self
            .db
            .append_message(&NewMessage::assistant(
                session_id,
                outcome.response.clone(),
                outcome.agent_role.clone(),
                outcome.duration_ms,
            ))
            .await
        {
            tracing::error!(
                error = %e,
                session_id = %session_id,
                "Failed to persist assistant message"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fastpath_vocabulary_covers_documented_set() {
        for keyword in ["specs", "threshold", "policy", "how do i", "manual"] {
            assert!(FASTPATH_KEYWORDS.contains(&keyword), "{keyword} missing");
        }
    }
}
