//! SQLite-backed [`DurableStore`] implementation.
//!
//! Keeps one row per `(tenant_id, filename)` in `raw_documents`. The engine
//! only ever reads through [`DurableStore::fetch_raw_documents`]; the write
//! helpers here are used by the upload and removal paths of the CLI and
//! HTTP server.

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use profile_recall_core::store::DurableStore;
use profile_recall_core::RawDocument;

/// What an upsert did to the stored upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// SQLite implementation of the [`DurableStore`] trait.
pub struct SqliteDurableStore {
    pool: SqlitePool,
}

impl SqliteDurableStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist an upload. Re-uploading a filename replaces its content;
    /// identical content is detected by hash and left alone.
    pub async fn upsert_raw_document(&self, tenant: &str, doc: &RawDocument) -> Result<UpsertOutcome> {
        let hash = content_hash(&doc.content);

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT content_hash FROM raw_documents WHERE tenant_id = ? AND filename = ?",
        )
        .bind(tenant)
        .bind(&doc.filename)
        .fetch_optional(&self.pool)
        .await?;

        let outcome = match existing {
            Some(ref h) if *h == hash => return Ok(UpsertOutcome::Unchanged),
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        };

        sqlx::query(
            r#"
            INSERT INTO raw_documents (id, tenant_id, filename, file_type, content,
                                       content_hash, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tenant_id, filename) DO UPDATE SET
                file_type = excluded.file_type,
                content = excluded.content,
                content_hash = excluded.content_hash,
                uploaded_at = excluded.uploaded_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(tenant)
        .bind(&doc.filename)
        .bind(&doc.file_type)
        .bind(&doc.content)
        .bind(&hash)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        tracing::debug!(tenant, filename = %doc.filename, ?outcome, "stored raw document");
        Ok(outcome)
    }

    /// Remove one upload. Returns whether it existed.
    pub async fn delete_raw_document(&self, tenant: &str, filename: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM raw_documents WHERE tenant_id = ? AND filename = ?")
            .bind(tenant)
            .bind(filename)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every upload of a tenant. Returns the number removed.
    pub async fn delete_tenant(&self, tenant: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM raw_documents WHERE tenant_id = ?")
            .bind(tenant)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Every tenant that has at least one stored upload.
    pub async fn list_tenants(&self) -> Result<Vec<String>> {
        let tenants: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT tenant_id FROM raw_documents ORDER BY tenant_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl DurableStore for SqliteDurableStore {
    async fn fetch_raw_documents(&self, tenant: &str) -> Result<Vec<RawDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT filename, content, file_type
            FROM raw_documents
            WHERE tenant_id = ?
            ORDER BY uploaded_at ASC, rowid ASC
            "#,
        )
        .bind(tenant)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<RawDocument> {
                Ok(RawDocument {
                    filename: row.try_get("filename")?,
                    content: row.try_get("content")?,
                    file_type: row.try_get("file_type")?,
                })
            })
            .collect()
    }
}
