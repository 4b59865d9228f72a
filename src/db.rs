//! SQLite pool for the raw-upload store.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::time::Duration;

use crate::config::Config;

/// Open the pool described by `[db]`, creating the file and its directory
/// on first use. Uploads and rehydration reads share the pool, so the file
/// runs in WAL mode and writers wait `busy_timeout_secs` on a held lock.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db = &config.db;

    if let Some(dir) = db.path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory: {}", dir.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(&db.path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(db.busy_timeout_secs));

    let pool = SqlitePoolOptions::new()
        .max_connections(db.max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {}", db.path.display()))?;

    tracing::debug!(
        path = %db.path.display(),
        max_connections = db.max_connections,
        "opened durable store"
    );
    Ok(pool)
}
