//! Read-only client for the Drive-style document source.
//!
//! Enumeration walks folders recursively from the configured root and
//! returns a flat, deterministically-ordered file list. Fetching exports
//! native documents as plain text and downloads everything else as bytes.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::DriveConfig;
use crate::error::{Result, SunsteadError};
use crate::models::SourceMime;

const FOLDER_CONTENT_TYPE: &str = "application/vnd.google-apps.folder";

/// One enumerated candidate file.
#[derive(Debug, Clone)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    /// Folder path relative to the sync root, e.g. `context/system`.
    pub folder_path: String,
    pub mime: SourceMime,
    pub modified_time: DateTime<Utc>,
}

/// Result of `preview`: counts plus the first-level folder listing.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SyncPreview {
    pub folders: Vec<String>,
    pub file_count: u64,
    pub doc_like_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileMeta>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMeta {
    id: String,
    name: String,
    mime_type: String,
    modified_time: Option<String>,
}

#[derive(Clone)]
pub struct DriveClient {
    client: Client,
    config: DriveConfig,
}

impl DriveClient {
    pub fn new(config: DriveConfig) -> Result<Self> {
        url::Url::parse(&config.base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SunsteadError::Sync(format!("Failed to create Drive client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Recursively enumerate supported files under the configured root,
    /// skipping ignore-patterned names. The result is sorted by
    /// (folder_path, name) so sync runs process documents in a stable
    /// order.
    pub async fn enumerate(&self) -> Result<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut queue: VecDeque<(String, String)> = VecDeque::new();
        queue.push_back((self.config.root_folder_id.clone(), String::new()));

        while let Some((folder_id, path)) = queue.pop_front() {
            for meta in self.list_folder(&folder_id).await? {
                if self.is_ignored(&meta.name) {
                    tracing::debug!(name = %meta.name, "Skipping ignore-patterned entry");
                    continue;
                }

                if meta.mime_type == FOLDER_CONTENT_TYPE {
                    let child_path = if path.is_empty() {
                        meta.name.clone()
                    } else {
                        format!("{path}/{}", meta.name)
                    };
                    queue.push_back((meta.id, child_path));
                    continue;
                }

                let Some(mime) = SourceMime::from_content_type(&meta.mime_type) else {
                    continue;
                };

                let modified_time = meta
                    .modified_time
                    .as_deref()
                    .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now);

                files.push(DriveFile {
                    id: meta.id,
                    name: meta.name,
                    folder_path: path.clone(),
                    mime,
                    modified_time,
                });
            }
        }

        files.sort_by(|a, b| {
            (a.folder_path.as_str(), a.name.as_str()).cmp(&(b.folder_path.as_str(), b.name.as_str()))
        });

        Ok(files)
    }

    /// Counts and first-level folder listing, without fetching content.
    pub async fn preview(&self) -> Result<SyncPreview> {
        let mut first_level_folders = Vec::new();
        for meta in self.list_folder(&self.config.root_folder_id).await? {
            if meta.mime_type == FOLDER_CONTENT_TYPE && !self.is_ignored(&meta.name) {
                first_level_folders.push(meta.name);
            }
        }
        first_level_folders.sort();

        let files = self.enumerate().await?;
        let doc_like = files.len() as u64;

        Ok(SyncPreview {
            folders: first_level_folders,
            // Enumeration already filters to supported kinds, so both counts
            // reflect doc-like files; unsupported blobs never reach here.
            file_count: doc_like,
            doc_like_count: doc_like,
        })
    }

    /// Fetch document content. Native documents are exported as plain text;
    /// other kinds are downloaded as stored.
    pub async fn fetch(&self, file: &DriveFile) -> Result<Vec<u8>> {
        let url = match file.mime {
            SourceMime::GoogleDoc => format!(
                "{}/files/{}/export?mimeType=text/plain",
                self.config.base_url, file.id
            ),
            _ => format!("{}/files/{}?alt=media", self.config.base_url, file.id),
        };

        let mut request = self.client.get(&url);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SunsteadError::Upstream {
                service: "drive".to_string(),
                message: format!("Fetch of '{}' failed with {status}: {body}", file.name),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Tier-1 detection: a file is a context file when its path sits under
    /// the configured context folder. Its category is the next path segment.
    pub fn context_category(&self, folder_path: &str) -> Option<String> {
        let rest = folder_path.strip_prefix(&self.config.context_folder)?;
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        let category = rest.split('/').next().unwrap_or("").trim();
        if category.is_empty() {
            Some("system".to_string())
        } else {
            Some(category.to_string())
        }
    }

    async fn list_folder(&self, folder_id: &str) -> Result<Vec<FileMeta>> {
        let mut all = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/files", self.config.base_url))
                .query(&[
                    ("q", format!("'{folder_id}' in parents and trashed = false")),
                    (
                        "fields",
                        "nextPageToken, files(id, name, mimeType, modifiedTime)".to_string(),
                    ),
                    ("orderBy", "name".to_string()),
                ]);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            if let Some(token) = &self.config.api_token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                let body = response.text().await.unwrap_or_default();
                return Err(SunsteadError::ApiAuth(format!(
                    "Drive listing rejected: {body}"
                )));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SunsteadError::Upstream {
                    service: "drive".to_string(),
                    message: format!("Listing failed with {status}: {body}"),
                });
            }

            let page: FileList = response
                .json()
                .await
                .map_err(|e| SunsteadError::Sync(format!("Invalid listing response: {e}")))?;

            all.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all)
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.config
            .ignore_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && name.contains(pattern.as_str()))
    }
}
