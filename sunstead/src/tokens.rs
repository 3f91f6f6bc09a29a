//! Crate-wide token estimation.
//!
//! One estimator is used everywhere tokens are counted (chunking, bundle
//! budgets, document totals) so the sums in different subsystems agree.

/// Estimate the token count of a text.
///
/// Approximates the tokenizer used by the embedding and completion models
/// at roughly four characters per token, never returning 0 for non-empty
/// input.
pub fn estimate_tokens(text: &str) -> i64 {
    if text.is_empty() {
        return 0;
    }
    ((text.len() as f64) / 4.0).ceil() as i64
}

/// Truncate `text` from the tail so it fits within `max_tokens`, cutting at
/// the last line boundary inside the limit when one exists.
pub fn truncate_to_tokens(text: &str, max_tokens: i64) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }
    if max_tokens <= 0 {
        return String::new();
    }

    let max_bytes = (max_tokens as usize).saturating_mul(4);
    let mut cut = max_bytes.min(text.len());
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let head = &text[..cut];

    match head.rfind('\n') {
        Some(pos) if pos > 0 => head[..pos].to_string(),
        _ => head.to_string(),
    }
}
