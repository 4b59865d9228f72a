//! Wiring between the engine and the SQLite durable store.
//!
//! [`App`] is built once per process and shared by the CLI commands and
//! the HTTP handlers. Uploads are written to the durable store before they
//! are indexed, so a later cold start can always rebuild what was indexed.
//!
//! Every write that touches both the store and the index runs under a
//! per-tenant lock, so the stored row and the indexed records for a filename
//! always come from the same upload.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use profile_recall_core::{Engine, RawDocument, TenantId};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::{SqliteDurableStore, UpsertOutcome};

/// Shared handles for one running process.
#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub store: Arc<SqliteDurableStore>,
    pub engine: Arc<Engine>,
    write_locks: Arc<Mutex<HashMap<TenantId, Arc<Mutex<()>>>>>,
}

/// Result of a single upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub filename: String,
    pub stored: &'static str,
    pub document_ids: Vec<String>,
}

/// Result of removing a source.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveReport {
    pub source: String,
    pub stored_removed: bool,
    pub records_removed: usize,
}

impl App {
    /// Connect, migrate, and build an engine with cold (empty) indexes.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool)
            .await
            .context("Failed to prepare durable store schema")?;
        let store = Arc::new(SqliteDurableStore::new(pool));
        let engine = Arc::new(Engine::new(store.clone(), config.engine_settings()));
        Ok(Self {
            config: Arc::new(config.clone()),
            store,
            engine,
            write_locks: Arc::default(),
        })
    }

    /// Serialize store-then-index writes for one tenant.
    async fn lock_tenant_writes(&self, tenant: &TenantId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.write_locks.lock().await;
            locks.entry(tenant.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Persist an upload, then segment and index it under its filename.
    ///
    /// The global tenant has no durable key; its uploads are indexed only.
    pub async fn upload(&self, tenant: &TenantId, doc: RawDocument) -> Result<UploadReport> {
        let _writes = self.lock_tenant_writes(tenant).await;
        let stored = match tenant.profile_key() {
            Some(key) => match self.store.upsert_raw_document(key, &doc).await? {
                UpsertOutcome::Inserted => "inserted",
                UpsertOutcome::Updated => "updated",
                UpsertOutcome::Unchanged => "unchanged",
            },
            None => "not persisted",
        };

        let document_ids = self
            .engine
            .ingest_raw(tenant, &doc.content, Some(&doc.filename))
            .await?;

        tracing::info!(
            tenant = %tenant,
            filename = %doc.filename,
            stored,
            records = document_ids.len(),
            "upload indexed"
        );
        Ok(UploadReport {
            filename: doc.filename,
            stored,
            document_ids,
        })
    }

    /// Forget one source everywhere: the stored upload and its records.
    pub async fn remove_source(&self, tenant: &TenantId, source: &str) -> Result<RemoveReport> {
        let _writes = self.lock_tenant_writes(tenant).await;
        let stored_removed = match tenant.profile_key() {
            Some(key) => self.store.delete_raw_document(key, source).await?,
            None => false,
        };
        let records_removed = self.engine.delete_source(tenant, source).await;
        Ok(RemoveReport {
            source: source.to_string(),
            stored_removed,
            records_removed,
        })
    }

    /// Forget a tenant's uploads and empty its index.
    pub async fn purge_tenant(&self, tenant: &TenantId) -> Result<u64> {
        let _writes = self.lock_tenant_writes(tenant).await;
        let removed = match tenant.profile_key() {
            Some(key) => self.store.delete_tenant(key).await?,
            None => 0,
        };
        self.engine.clear_tenant(tenant).await;
        Ok(removed)
    }

    pub async fn close(&self) {
        self.engine.shutdown().await;
        self.store.pool().close().await;
    }
}

/// MIME-ish type for the text files this application accepts.
pub fn file_type_for(filename: &str) -> Option<&'static str> {
    let ext = std::path::Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match ext.as_str() {
        "md" | "markdown" => Some("text/markdown"),
        "txt" | "text" => Some("text/plain"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_for() {
        assert_eq!(file_type_for("resume.md"), Some("text/markdown"));
        assert_eq!(file_type_for("NOTES.TXT"), Some("text/plain"));
        assert_eq!(file_type_for("a/b/answers.markdown"), Some("text/markdown"));
        assert_eq!(file_type_for("resume.pdf"), None);
        assert_eq!(file_type_for("Makefile"), None);
    }
}
