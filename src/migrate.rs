use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the durable-store schema on a fresh pool, then close it.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index the durable store needs. Idempotent.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // Raw uploads, one row per (tenant, filename)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_documents (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            filename TEXT NOT NULL,
            file_type TEXT NOT NULL DEFAULT 'text/plain',
            content TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            uploaded_at INTEGER NOT NULL,
            UNIQUE(tenant_id, filename)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_raw_documents_tenant ON raw_documents(tenant_id)")
        .execute(pool)
        .await?;

    Ok(())
}
