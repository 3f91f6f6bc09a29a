use chrono::Utc;
use libsql::{params, Connection, Row};

use crate::error::{Result, SunsteadError};
use crate::models::{Document, DocumentFilter, DocumentSummary, NewDocument, SourceMime};

use super::parse_ts;

pub struct DocumentRepository;

impl DocumentRepository {
    /// Insert or update by external id; returns the internal id.
    pub async fn upsert(conn: &Connection, doc: &NewDocument) -> Result<i64> {
        conn.execute(
            r#"
            INSERT INTO kb_documents (
                external_id, title, folder_path, mime, content, token_count,
                is_context_file, context_category, last_synced
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(external_id) DO UPDATE SET
                title = excluded.title,
                folder_path = excluded.folder_path,
                mime = excluded.mime,
                content = excluded.content,
                token_count = excluded.token_count,
                is_context_file = excluded.is_context_file,
                context_category = excluded.context_category,
                last_synced = excluded.last_synced
            "#,
            params![
                doc.external_id.clone(),
                doc.title.clone(),
                doc.folder_path.clone(),
                doc.mime.as_str(),
                doc.content.clone(),
                doc.token_count,
                doc.is_context_file as i64,
                doc.context_category.clone(),
                Utc::now().to_rfc3339(),
            ],
        )
        .await?;

        let mut rows = conn
            .query(
                "SELECT id FROM kb_documents WHERE external_id = ?1",
                params![doc.external_id.clone()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Err(SunsteadError::Internal(format!(
                "Upserted document '{}' not found",
                doc.external_id
            ))),
        }
    }

    pub async fn get_by_external_id(
        conn: &Connection,
        external_id: &str,
    ) -> Result<Option<Document>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, external_id, title, folder_path, mime, content,
                       token_count, is_context_file, context_category, last_synced
                FROM kb_documents
                WHERE external_id = ?1
                "#,
                params![external_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_document(&row)?)),
            None => Ok(None),
        }
    }

    /// Returns true when a row was removed. Chunks are deleted explicitly;
    /// SQLite only honors the FK cascade on connections that opt in.
    pub async fn delete_by_external_id(conn: &Connection, external_id: &str) -> Result<bool> {
        conn.execute(
            r#"
            DELETE FROM kb_chunks
            WHERE document_id IN (SELECT id FROM kb_documents WHERE external_id = ?1)
            "#,
            params![external_id],
        )
        .await?;

        let affected = conn
            .execute(
                "DELETE FROM kb_documents WHERE external_id = ?1",
                params![external_id],
            )
            .await?;
        Ok(affected > 0)
    }

    pub async fn list(
        conn: &Connection,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentSummary>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<libsql::Value> = Vec::new();

        if let Some(prefix) = &filter.folder_prefix {
            values.push(libsql::Value::from(format!("{prefix}%")));
            clauses.push(format!("d.folder_path LIKE ?{}", values.len()));
        }
        if let Some(mime) = filter.mime {
            values.push(libsql::Value::from(mime.as_str()));
            clauses.push(format!("d.mime = ?{}", values.len()));
        }
        if filter.context_files_only {
            clauses.push("d.is_context_file = 1".to_string());
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let query = format!(
            r#"
            SELECT d.id, d.external_id, d.title, d.folder_path, d.mime,
                   d.token_count, d.is_context_file, d.context_category,
                   d.last_synced,
                   (SELECT COUNT(*) FROM kb_chunks c WHERE c.document_id = d.id) AS chunk_count
            FROM kb_documents d
            {where_clause}
            ORDER BY d.folder_path, d.title
            "#
        );

        let mut rows = conn.query(&query, libsql::params_from_iter(values)).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(DocumentSummary {
                id: row.get::<i64>(0)?,
                external_id: row.get::<String>(1)?,
                title: row.get::<String>(2)?,
                folder_path: row.get::<String>(3)?,
                mime: parse_mime(&row.get::<String>(4)?)?,
                token_count: row.get::<i64>(5)?,
                is_context_file: row.get::<i64>(6)? != 0,
                context_category: row.get::<Option<String>>(7)?,
                last_synced: parse_ts(&row.get::<String>(8)?)?,
                chunk_count: row.get::<i64>(9)?,
            });
        }

        Ok(results)
    }

    pub async fn list_external_ids(conn: &Connection) -> Result<Vec<String>> {
        let mut rows = conn
            .query("SELECT external_id FROM kb_documents", ())
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    /// Tier-1 context files, optionally restricted by category tag. Ordered
    /// by folder then title so bundle assembly is deterministic.
    pub async fn context_files(
        conn: &Connection,
        categories: Option<&[String]>,
    ) -> Result<Vec<Document>> {
        let base = r#"
            SELECT id, external_id, title, folder_path, mime, content,
                   token_count, is_context_file, context_category, last_synced
            FROM kb_documents
            WHERE is_context_file = 1
        "#;

        let (query, values) = match categories {
            Some(tags) if !tags.is_empty() => {
                let placeholders: Vec<String> =
                    (1..=tags.len()).map(|i| format!("?{i}")).collect();
                let q = format!(
                    "{base} AND context_category IN ({}) ORDER BY folder_path, title",
                    placeholders.join(", ")
                );
                let vals: Vec<libsql::Value> = tags
                    .iter()
                    .map(|t| libsql::Value::from(t.clone()))
                    .collect();
                (q, vals)
            }
            _ => (
                format!("{base} ORDER BY folder_path, title"),
                Vec::new(),
            ),
        };

        let mut rows = conn.query(&query, libsql::params_from_iter(values)).await?;

        let mut docs = Vec::new();
        while let Some(row) = rows.next().await? {
            docs.push(Self::row_to_document(&row)?);
        }
        Ok(docs)
    }

    fn row_to_document(row: &Row) -> Result<Document> {
        Ok(Document {
            id: row.get::<i64>(0)?,
            external_id: row.get::<String>(1)?,
            title: row.get::<String>(2)?,
            folder_path: row.get::<String>(3)?,
            mime: parse_mime(&row.get::<String>(4)?)?,
            content: row.get::<String>(5)?,
            token_count: row.get::<i64>(6)?,
            is_context_file: row.get::<i64>(7)? != 0,
            context_category: row.get::<Option<String>>(8)?,
            last_synced: parse_ts(&row.get::<String>(9)?)?,
        })
    }
}

fn parse_mime(raw: &str) -> Result<SourceMime> {
    SourceMime::parse(raw)
        .ok_or_else(|| SunsteadError::Internal(format!("Unknown stored mime kind '{raw}'")))
}
