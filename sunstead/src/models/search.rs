use serde::{Deserialize, Serialize};

/// One ranked chunk from a vector search, joined with its document for
/// citation rendering.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct KbSearchHit {
    pub chunk_id: i64,
    pub document_id: i64,
    pub title: String,
    pub folder_path: String,
    pub content: String,
    /// Cosine similarity in `[-1, 1]`, higher is closer.
    pub similarity: f64,
}

impl KbSearchHit {
    /// Citation tuple rendered as `(title, folder)`.
    pub fn citation(&self) -> String {
        format!("({}, {})", self.title, self.folder_path)
    }
}
