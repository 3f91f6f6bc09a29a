//! Deterministic query classification.
//!
//! Weighted vocabulary rules map raw user text to a category. The heaviest
//! matched category wins; confidence is the winner's share of all matched
//! rule weight. Classification always commits, even at low confidence.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::QueryType;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub query_type: QueryType,
    pub confidence: f64,
}

struct Rule {
    category: QueryType,
    weight: u32,
    pattern: Regex,
}

fn rule(category: QueryType, weight: u32, pattern: &str) -> Rule {
    Rule {
        category,
        weight,
        // Patterns are static; a failure here is a programming error caught
        // by the rules_compile test.
        pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad rule pattern: {e}")),
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // Planning vocabulary: imperative / decision questions. Heaviest so
        // "should we run the miners" plans rather than reads gauges.
        rule(QueryType::Planning, 4, r"\bshould (we|i)\b"),
        rule(QueryType::Planning, 3, r"\bwhen should\b"),
        rule(QueryType::Planning, 3, r"\boptimi[sz]e\b"),
        rule(QueryType::Planning, 3, r"\bplan\b"),
        rule(QueryType::Planning, 2, r"\bschedule\b"),
        rule(QueryType::Planning, 2, r"\bstrategy\b"),
        // Research vocabulary: comparative / industry / current-info.
        rule(QueryType::Research, 3, r"\btrends?\b"),
        rule(QueryType::Research, 3, r"\bbest practices?\b"),
        rule(QueryType::Research, 3, r"\blatest\b"),
        rule(QueryType::Research, 2, r"\bindustry\b"),
        rule(QueryType::Research, 2, r"\bmarket\b"),
        rule(QueryType::Research, 2, r"\bcompare(d)?\b"),
        rule(QueryType::Research, 2, r"\bcurrent (price|cost|model|generation)s?\b"),
        // System vocabulary: this installation's hardware and first-person
        // possessives.
        rule(QueryType::System, 3, r"\bmy (battery|solar|panels?|inverter|system|power)\b"),
        rule(QueryType::System, 2, r"\bthe miners?\b"),
        rule(QueryType::System, 2, r"\b(battery|charge) level\b"),
        rule(QueryType::System, 2, r"\b(soc|state of charge)\b"),
        rule(QueryType::System, 2, r"\binverter\b"),
        rule(QueryType::System, 2, r"\bsolar production\b"),
        rule(QueryType::System, 1, r"\bright now\b"),
        rule(QueryType::System, 1, r"\bcurrently\b"),
        rule(QueryType::System, 1, r"\btoday\b"),
    ]
});

/// Tie-break precedence when matched weights are equal: a planning verb
/// beats the hardware nouns it operates on.
fn precedence(category: QueryType) -> u8 {
    match category {
        QueryType::Planning => 3,
        QueryType::Research => 2,
        QueryType::System => 1,
        QueryType::General => 0,
    }
}

pub fn classify(text: &str) -> Classification {
    let normalized = text.to_lowercase();

    let mut scores: [(QueryType, u32); 3] = [
        (QueryType::Planning, 0),
        (QueryType::Research, 0),
        (QueryType::System, 0),
    ];

    for r in RULES.iter() {
        if r.pattern.is_match(&normalized) {
            for (category, score) in scores.iter_mut() {
                if *category == r.category {
                    *score += r.weight;
                }
            }
        }
    }

    let total: u32 = scores.iter().map(|(_, s)| s).sum();
    if total == 0 {
        return Classification {
            query_type: QueryType::General,
            confidence: 1.0,
        };
    }

    let (winner, winner_score) = scores
        .iter()
        .copied()
        .max_by_key(|&(category, score)| (score, precedence(category)))
        .unwrap_or((QueryType::General, 0));

    Classification {
        query_type: winner,
        confidence: f64::from(winner_score) / f64::from(total),
    }
}
