use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tokens::estimate_tokens;

/// Semantic category of a user query. Selects the token budget and the
/// routing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    System,
    Research,
    Planning,
    General,
}

impl QueryType {
    /// Hard token budget for an assembled bundle of this category.
    pub fn token_budget(self) -> i64 {
        match self {
            Self::System => 2_000,
            Self::Research => 4_000,
            Self::Planning => 3_500,
            Self::General => 1_000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Research => "research",
            Self::Planning => "planning",
            Self::General => "general",
        }
    }
}

/// Sections of a bundle in truncation order: when a bundle exceeds its
/// budget, the lowest-priority section is trimmed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleSection {
    User,
    Conversation,
    Kb,
    System,
}

impl BundleSection {
    /// Sections ordered lowest priority first.
    pub const TRUNCATION_ORDER: [BundleSection; 4] = [
        BundleSection::User,
        BundleSection::Conversation,
        BundleSection::Kb,
        BundleSection::System,
    ];
}

/// The assembled, budgeted context handed to a reasoner or the KB-direct
/// path. Serialized whole as the cache value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBundle {
    pub system: String,
    pub kb: String,
    pub conversation: String,
    pub user: String,
    pub total_tokens: i64,
    pub query_type: QueryType,
    /// True when this bundle was served from the cache rather than built.
    #[serde(default)]
    pub from_cache: bool,
    pub built_at: DateTime<Utc>,
    /// Sources that failed during assembly (e.g. "kb", "conversation");
    /// surfaced in telemetry so degraded answers are attributable.
    #[serde(default)]
    pub degraded_sources: Vec<String>,
}

impl ContextBundle {
    pub fn empty(query_type: QueryType) -> Self {
        Self {
            system: String::new(),
            kb: String::new(),
            conversation: String::new(),
            user: String::new(),
            total_tokens: 0,
            query_type,
            from_cache: false,
            built_at: Utc::now(),
            degraded_sources: Vec::new(),
        }
    }

    pub fn section(&self, section: BundleSection) -> &str {
        match section {
            BundleSection::User => &self.user,
            BundleSection::Conversation => &self.conversation,
            BundleSection::Kb => &self.kb,
            BundleSection::System => &self.system,
        }
    }

    pub fn section_mut(&mut self, section: BundleSection) -> &mut String {
        match section {
            BundleSection::User => &mut self.user,
            BundleSection::Conversation => &mut self.conversation,
            BundleSection::Kb => &mut self.kb,
            BundleSection::System => &mut self.system,
        }
    }

    /// Recompute `total_tokens` from the current section contents.
    pub fn recount(&mut self) {
        self.total_tokens = estimate_tokens(&self.system)
            + estimate_tokens(&self.kb)
            + estimate_tokens(&self.conversation)
            + estimate_tokens(&self.user);
    }

    /// Render the bundle as the prompt context block handed to reasoners.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (label, body) in [
            ("System context", &self.system),
            ("Knowledge base", &self.kb),
            ("Recent conversation", &self.conversation),
            ("User preferences", &self.user),
        ] {
            if !body.is_empty() {
                out.push_str("## ");
                out.push_str(label);
                out.push('\n');
                out.push_str(body);
                out.push_str("\n\n");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budgets_match_mandated_targets() {
        assert_eq!(QueryType::System.token_budget(), 2_000);
        assert_eq!(QueryType::Research.token_budget(), 4_000);
        assert_eq!(QueryType::Planning.token_budget(), 3_500);
        assert_eq!(QueryType::General.token_budget(), 1_000);
    }

    #[test]
    fn query_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(QueryType::Planning).unwrap(),
            serde_json::json!("planning")
        );
    }

    #[test]
    fn truncation_order_drops_user_first_system_last() {
        assert_eq!(BundleSection::TRUNCATION_ORDER[0], BundleSection::User);
        assert_eq!(BundleSection::TRUNCATION_ORDER[3], BundleSection::System);
    }

    #[test]
    fn recount_sums_all_sections() {
        let mut bundle = ContextBundle::empty(QueryType::General);
        bundle.system = "a".repeat(40);
        bundle.conversation = "b".repeat(40);
        bundle.recount();
        assert_eq!(bundle.total_tokens, 20);
    }

    #[test]
    fn render_skips_empty_sections() {
        let mut bundle = ContextBundle::empty(QueryType::System);
        bundle.system = "battery min SOC is 40%".to_string();
        let rendered = bundle.render();
        assert!(rendered.contains("## System context"));
        assert!(!rendered.contains("Knowledge base"));
    }
}
