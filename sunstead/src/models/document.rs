use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mime kind of a synced document, after mapping from the source system's
/// content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceMime {
    GoogleDoc,
    Markdown,
    Html,
    Pdf,
    PlainText,
}

impl SourceMime {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GoogleDoc => "google_doc",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::PlainText => "plain_text",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "google_doc" => Some(Self::GoogleDoc),
            "markdown" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "plain_text" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Map an upstream content type to a supported kind. Unsupported types
    /// are excluded from sync entirely.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "application/vnd.google-apps.document" => Some(Self::GoogleDoc),
            "text/markdown" => Some(Self::Markdown),
            "text/html" => Some(Self::Html),
            "application/pdf" => Some(Self::Pdf),
            "text/plain" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// A synced knowledge-base document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    /// Source-system id, stable across renames.
    pub external_id: String,
    pub title: String,
    pub folder_path: String,
    pub mime: SourceMime,
    pub content: String,
    pub token_count: i64,
    /// Tier-1 documents are always considered for the system section of a
    /// context bundle.
    pub is_context_file: bool,
    /// Category tag for tier-1 files (system, hardware, docs, preferences),
    /// derived from the folder path under the context root.
    pub context_category: Option<String>,
    pub last_synced: DateTime<Utc>,
}

/// Listing row without the full content payload.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DocumentSummary {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub folder_path: String,
    pub mime: SourceMime,
    pub token_count: i64,
    pub is_context_file: bool,
    pub context_category: Option<String>,
    pub chunk_count: i64,
    pub last_synced: DateTime<Utc>,
}

/// Input for `upsert_document`.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub external_id: String,
    pub title: String,
    pub folder_path: String,
    pub mime: SourceMime,
    pub content: String,
    pub token_count: i64,
    pub is_context_file: bool,
    pub context_category: Option<String>,
}

/// Filters for `list_documents`.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub folder_prefix: Option<String>,
    pub mime: Option<SourceMime>,
    pub context_files_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: i64,
    pub document_id: i64,
    pub chunk_index: i64,
    pub content: String,
    pub token_count: i64,
}

/// Chunk payload for `replace_chunks`; the embedding dimension must match
/// the store's configured dimension.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub chunk_index: i64,
    pub content: String,
    pub token_count: i64,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Full,
    Incremental,
}

impl SyncKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "full" => Some(Self::Full),
            "incremental" => Some(Self::Incremental),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Running,
    Completed,
    Failed,
    Partial,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Partial => "partial",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One invocation of the document synchronizer.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SyncRun {
    pub id: i64,
    pub kind: SyncKind,
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processed: i64,
    pub updated: i64,
    pub failed: i64,
    pub triggered_by: String,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_roundtrips_through_str() {
        for mime in [
            SourceMime::GoogleDoc,
            SourceMime::Markdown,
            SourceMime::Html,
            SourceMime::Pdf,
            SourceMime::PlainText,
        ] {
            assert_eq!(SourceMime::parse(mime.as_str()), Some(mime));
        }
        assert_eq!(SourceMime::parse("spreadsheet"), None);
    }

    #[test]
    fn unsupported_content_types_are_excluded() {
        assert_eq!(
            SourceMime::from_content_type("application/vnd.google-apps.document"),
            Some(SourceMime::GoogleDoc)
        );
        assert_eq!(SourceMime::from_content_type("image/png"), None);
        assert_eq!(
            SourceMime::from_content_type("application/vnd.google-apps.spreadsheet"),
            None
        );
    }

    #[test]
    fn sync_status_terminality() {
        assert!(!SyncStatus::Running.is_terminal());
        assert!(SyncStatus::Completed.is_terminal());
        assert!(SyncStatus::Failed.is_terminal());
        assert!(SyncStatus::Partial.is_terminal());
    }
}
