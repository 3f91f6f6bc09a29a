use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{Chunk, KbSearchHit, NewChunk};

pub struct ChunkRepository;

impl ChunkRepository {
    /// Replace all chunks of a document atomically: delete-then-insert
    /// inside one transaction, rolled back on any failure.
    pub async fn replace(
        conn: &Connection,
        document_id: i64,
        chunks: &[NewChunk],
    ) -> Result<()> {
        conn.execute_batch("BEGIN IMMEDIATE").await?;

        let result = Self::replace_inner(conn, document_id, chunks).await;
        match result {
            Ok(()) => {
                conn.execute_batch("COMMIT").await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK").await {
                    tracing::warn!(error = %rollback_err, "Chunk replace rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn replace_inner(
        conn: &Connection,
        document_id: i64,
        chunks: &[NewChunk],
    ) -> Result<()> {
        conn.execute(
            "DELETE FROM kb_chunks WHERE document_id = ?1",
            params![document_id],
        )
        .await?;

        for chunk in chunks {
            let embedding_json = serde_json::to_string(&chunk.embedding)?;
            conn.execute(
                r#"
                INSERT INTO kb_chunks (document_id, chunk_index, content, token_count, embedding)
                VALUES (?1, ?2, ?3, ?4, vector32(?5))
                "#,
                params![
                    document_id,
                    chunk.chunk_index,
                    chunk.content.clone(),
                    chunk.token_count,
                    embedding_json,
                ],
            )
            .await?;
        }

        Ok(())
    }

    pub async fn get_by_document(conn: &Connection, document_id: i64) -> Result<Vec<Chunk>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, document_id, chunk_index, content, token_count
                FROM kb_chunks
                WHERE document_id = ?1
                ORDER BY chunk_index
                "#,
                params![document_id],
            )
            .await?;

        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(Chunk {
                id: row.get::<i64>(0)?,
                document_id: row.get::<i64>(1)?,
                chunk_index: row.get::<i64>(2)?,
                content: row.get::<String>(3)?,
                token_count: row.get::<i64>(4)?,
            });
        }
        Ok(chunks)
    }

    /// Cosine top-k over the chunk index, joined with documents for
    /// citations. An empty index returns an empty list, not an error.
    pub async fn search_similar(
        conn: &Connection,
        embedding: &[f32],
        limit: u32,
        folder_prefix: Option<&str>,
    ) -> Result<Vec<KbSearchHit>> {
        let embedding_json = serde_json::to_string(embedding)?;

        let (query, values): (String, Vec<libsql::Value>) = match folder_prefix {
            Some(prefix) => (
                r#"
                SELECT c.id, c.document_id, d.title, d.folder_path, c.content,
                       1 - vector_distance_cos(c.embedding, vector32(?1)) AS similarity
                FROM kb_chunks c
                JOIN kb_documents d ON c.document_id = d.id
                WHERE d.folder_path LIKE ?3
                ORDER BY similarity DESC
                LIMIT ?2
                "#
                .to_string(),
                vec![
                    libsql::Value::from(embedding_json),
                    libsql::Value::from(limit),
                    libsql::Value::from(format!("{prefix}%")),
                ],
            ),
            None => (
                r#"
                SELECT c.id, c.document_id, d.title, d.folder_path, c.content,
                       1 - vector_distance_cos(c.embedding, vector32(?1)) AS similarity
                FROM kb_chunks c
                JOIN kb_documents d ON c.document_id = d.id
                ORDER BY similarity DESC
                LIMIT ?2
                "#
                .to_string(),
                vec![
                    libsql::Value::from(embedding_json),
                    libsql::Value::from(limit),
                ],
            ),
        };

        let mut rows = conn.query(&query, libsql::params_from_iter(values)).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(KbSearchHit {
                chunk_id: row.get::<i64>(0)?,
                document_id: row.get::<i64>(1)?,
                title: row.get::<String>(2)?,
                folder_path: row.get::<String>(3)?,
                content: row.get::<String>(4)?,
                similarity: row.get::<f64>(5)?,
            });
        }

        Ok(results)
    }
}
