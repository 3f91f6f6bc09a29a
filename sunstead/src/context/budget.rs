//! Token budget enforcement for context bundles.
//!
//! Sections are built from discrete blocks (context files, KB chunks,
//! conversation messages). When a bundle exceeds its category budget, whole
//! blocks are dropped from the tail, lowest-priority section first; a block
//! is never split.

use chrono::Utc;

use crate::models::{BundleSection, ContextBundle, QueryType};
use crate::tokens::estimate_tokens;

const BLOCK_JOINER: &str = "\n\n";

/// Join per-section blocks into a bundle that fits the category budget.
pub fn assemble_within_budget(
    query_type: QueryType,
    system: Vec<String>,
    kb: Vec<String>,
    conversation: Vec<String>,
    user: Vec<String>,
) -> ContextBundle {
    let mut sections = SectionBlocks {
        system,
        kb,
        conversation,
        user,
    };

    let budget = query_type.token_budget();

    for section in BundleSection::TRUNCATION_ORDER {
        while sections.total_tokens() > budget {
            if sections.blocks_mut(section).pop().is_none() {
                break;
            }
        }
        if sections.total_tokens() <= budget {
            break;
        }
    }

    let mut bundle = ContextBundle {
        system: sections.system.join(BLOCK_JOINER),
        kb: sections.kb.join(BLOCK_JOINER),
        conversation: sections.conversation.join(BLOCK_JOINER),
        user: sections.user.join(BLOCK_JOINER),
        total_tokens: 0,
        query_type,
        from_cache: false,
        built_at: Utc::now(),
        degraded_sources: Vec::new(),
    };
    bundle.recount();
    bundle
}

struct SectionBlocks {
    system: Vec<String>,
    kb: Vec<String>,
    conversation: Vec<String>,
    user: Vec<String>,
}

impl SectionBlocks {
    fn blocks_mut(&mut self, section: BundleSection) -> &mut Vec<String> {
        match section {
            BundleSection::System => &mut self.system,
            BundleSection::Kb => &mut self.kb,
            BundleSection::Conversation => &mut self.conversation,
            BundleSection::User => &mut self.user,
        }
    }

    fn total_tokens(&self) -> i64 {
        section_tokens(&self.system)
            + section_tokens(&self.kb)
            + section_tokens(&self.conversation)
            + section_tokens(&self.user)
    }
}

fn section_tokens(blocks: &[String]) -> i64 {
    if blocks.is_empty() {
        return 0;
    }
    let joiner_tokens = estimate_tokens(BLOCK_JOINER) * (blocks.len() as i64 - 1);
    blocks.iter().map(|b| estimate_tokens(b)).sum::<i64>() + joiner_tokens
}
