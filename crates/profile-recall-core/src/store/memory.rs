//! In-memory [`DurableStore`] implementation for tests and embedding.
//!
//! Keeps uploads per tenant in insertion order behind a `std::sync::RwLock`.
//! Re-uploading a filename replaces the earlier upload in place. A fetch
//! counter lets callers observe how often rehydration actually hit the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::RawDocument;

use super::DurableStore;

/// In-memory durable store.
#[derive(Debug, Default)]
pub struct InMemoryDurableStore {
    docs: RwLock<HashMap<String, Vec<RawDocument>>>,
    fetches: AtomicUsize,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist an upload, replacing any earlier upload with the same filename.
    pub fn put(&self, tenant: &str, doc: RawDocument) -> Result<()> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let uploads = docs.entry(tenant.to_string()).or_default();
        match uploads.iter_mut().find(|d| d.filename == doc.filename) {
            Some(existing) => *existing = doc,
            None => uploads.push(doc),
        }
        Ok(())
    }

    /// Remove an upload; returns whether it existed.
    pub fn remove(&self, tenant: &str, filename: &str) -> Result<bool> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let Some(uploads) = docs.get_mut(tenant) else {
            return Ok(false);
        };
        let before = uploads.len();
        uploads.retain(|d| d.filename != filename);
        Ok(uploads.len() != before)
    }

    /// Number of `fetch_raw_documents` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn fetch_raw_documents(&self, tenant: &str) -> Result<Vec<RawDocument>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let docs = self
            .docs
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        Ok(docs.get(tenant).cloned().unwrap_or_default())
    }
}
