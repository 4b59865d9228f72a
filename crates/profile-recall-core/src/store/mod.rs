//! Durable storage abstraction consumed by the rehydrator.
//!
//! The core never writes to durable storage; it only reads every raw upload
//! of a tenant when that tenant's in-memory index has to be rebuilt. Writing
//! uploads is the hosting application's job (see the SQLite implementation
//! in the `profile-recall` crate).
//!
//! Implementations must be `Send + Sync` to be shared across request
//! handlers.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RawDocument;

/// Source of truth for raw uploads across restarts.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Every raw document previously persisted for `tenant`, in upload order.
    ///
    /// An unknown tenant yields an empty vector, not an error.
    async fn fetch_raw_documents(&self, tenant: &str) -> Result<Vec<RawDocument>>;
}

/// A store with nothing in it, for engines that never rehydrate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDurableStore;

#[async_trait]
impl DurableStore for NoDurableStore {
    async fn fetch_raw_documents(&self, _tenant: &str) -> Result<Vec<RawDocument>> {
        Ok(Vec::new())
    }
}
