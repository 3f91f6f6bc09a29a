use unicode_segmentation::UnicodeSegmentation;

use crate::tokens::estimate_tokens;

#[derive(Debug, Clone)]
pub struct TextChunk {
    pub content: String,
    pub token_count: i64,
}

/// Sentence-boundary chunker. Sentences are merged greedily up to the token
/// target; chunks never overlap, so the sum of chunk token counts tracks the
/// document total up to per-chunk rounding.
pub struct TextChunker {
    target_tokens: i64,
}

impl TextChunker {
    pub fn new(target_tokens: i64) -> Self {
        Self {
            target_tokens: target_tokens.max(1),
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let sentences = self.split_into_sentences(text);
        self.merge_sentences_into_chunks(sentences)
    }

    fn split_into_sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();

        for grapheme in text.graphemes(true) {
            current.push_str(grapheme);

            if Self::is_sentence_boundary(&current) {
                let trimmed = current.trim().to_string();
                if !trimmed.is_empty() {
                    sentences.push(trimmed);
                }
                current.clear();
            }
        }

        if !current.trim().is_empty() {
            sentences.push(current.trim().to_string());
        }

        sentences
    }

    fn is_sentence_boundary(text: &str) -> bool {
        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            return false;
        }

        let Some(last_char) = trimmed.chars().last() else {
            return false;
        };

        if !matches!(last_char, '.' | '!' | '?' | '\n') {
            return false;
        }

        if last_char == '\n' {
            return true;
        }

        let words: Vec<&str> = trimmed.split_whitespace().collect();
        if let Some(last_word) = words.last() {
            let abbreviations = [
                "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Sr.", "Jr.", "vs.", "etc.", "i.e.", "e.g.",
                "Inc.", "Ltd.", "Corp.", "Co.", "No.", "Vol.", "Ch.", "Fig.", "Eq.", "Sec.",
            ];

            if abbreviations.contains(last_word) {
                return false;
            }
        }

        true
    }

    fn merge_sentences_into_chunks(&self, sentences: Vec<String>) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in sentences {
            let candidate_tokens = if current.is_empty() {
                estimate_tokens(&sentence)
            } else {
                estimate_tokens(&current) + estimate_tokens(&sentence) + 1
            };

            if candidate_tokens > self.target_tokens && !current.is_empty() {
                chunks.push(TextChunk {
                    token_count: estimate_tokens(&current),
                    content: std::mem::take(&mut current),
                });
            }

            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
        }

        if !current.is_empty() {
            chunks.push(TextChunk {
                token_count: estimate_tokens(&current),
                content: current,
            });
        }

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_no_chunks() {
        let chunker = TextChunker::default();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n ").is_empty());
    }

    #[test]
    fn short_text_yields_one_chunk() {
        let chunker = TextChunker::default();
        let chunks = chunker.chunk("The inverter reports state of charge. The battery is healthy.");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("inverter"));
    }

    #[test]
    fn chunk_indices_cover_text_without_overlap() {
        let chunker = TextChunker::new(16);
        let text = "One sentence about solar panels here. Another sentence about the battery bank. \
                    A third sentence about the generator. A fourth sentence about winter loads.";
        let chunks = chunker.chunk(text);

        assert!(chunks.len() > 1, "small target should split");
        // No overlap: every sentence appears in exactly one chunk.
        let combined: String = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(combined.matches("solar panels").count(), 1);
        assert_eq!(combined.matches("battery bank").count(), 1);
    }

    #[test]
    fn chunk_token_sums_track_document_total() {
        let chunker = TextChunker::new(20);
        let text = "First fact about the array. Second fact about the charge controller. \
                    Third fact about shore power. Fourth fact about load shedding.";
        let chunks = chunker.chunk(text);

        let chunk_sum: i64 = chunks.iter().map(|c| c.token_count).sum();
        let doc_total = estimate_tokens(text);
        let slack = chunks.len() as i64;
        assert!(
            (chunk_sum - doc_total).abs() <= slack,
            "chunk sum {chunk_sum} should match document total {doc_total} within {slack}"
        );
    }

    #[test]
    fn abbreviations_do_not_split_sentences() {
        let chunker = TextChunker::default();
        let chunks = chunker.chunk("Dr. Alvarez checked the panels. All good.");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("Dr. Alvarez checked the panels."));
    }

    #[test]
    fn every_chunk_has_positive_tokens() {
        let chunker = TextChunker::new(8);
        let chunks = chunker.chunk("Alpha beta gamma. Delta epsilon zeta. Eta theta iota.");
        assert!(chunks.iter().all(|c| c.token_count > 0));
    }
}
