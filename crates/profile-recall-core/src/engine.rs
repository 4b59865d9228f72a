//! The engine facade: ingestion, deletion, queries, and rehydration.
//!
//! An [`Engine`] owns the [`TenantStore`] and a handle to the
//! [`DurableStore`] collaborator. Construct one at process start, share it
//! via `Arc` with every request handler, and call [`Engine::shutdown`] when
//! tearing down.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`ingest_one`](Engine::ingest_one) | Index a single document |
//! | [`ingest_batch`](Engine::ingest_batch) | Index many, optionally replacing a source |
//! | [`ingest_raw`](Engine::ingest_raw) | Segment an upload, then batch-index it |
//! | [`delete_one`](Engine::delete_one) | Remove a record by id |
//! | [`delete_source`](Engine::delete_source) | Remove every record of a source |
//! | [`clear_tenant`](Engine::clear_tenant) | Empty a tenant's index |
//! | [`query`](Engine::query) | Ranked top-K search |
//! | [`count`](Engine::count) / [`list`](Engine::list) | Inspect a tenant |
//! | [`rehydrate`](Engine::rehydrate) | Force a rebuild from durable storage |
//!
//! Ingestion and reads (`query`, `count`, `list`) rehydrate a non-global
//! tenant whose index is empty and has not been loaded since it was last
//! cleared. A load that finds nothing still counts, so an empty tenant is
//! fetched once rather than on every read. Reads never leave an unknown
//! tenant registered: if the load finds nothing the slot is dropped again.
//! Deletes and clears act on the in-memory index only; clearing (and
//! [`shutdown`](Engine::shutdown)) makes the next use load again.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::MutexGuard;

use crate::error::{RecallError, Result};
use crate::index::{TenantIndex, TenantSlot, TenantStore};
use crate::models::{DocumentSummary, NewDocument, RankedResult, TenantId};
use crate::rehydrate::{fetch_and_stage, RehydrationPolicy};
use crate::score::ScoringWeights;
use crate::search::{rank, QueryOptions};
use crate::segment::segment_upload;
use crate::store::{DurableStore, NoDurableStore};
use crate::tokenize::tokenize;

/// Engine-wide tuning, usually built from application config.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub weights: ScoringWeights,
    pub rehydrate_timeout: Duration,
    pub rehydration_policy: RehydrationPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            rehydrate_timeout: Duration::from_secs(30),
            rehydration_policy: RehydrationPolicy::Fail,
        }
    }
}

/// Multi-tenant lexical retrieval engine.
pub struct Engine {
    tenants: TenantStore,
    durable: Arc<dyn DurableStore>,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(durable: Arc<dyn DurableStore>, settings: EngineSettings) -> Self {
        Self {
            tenants: TenantStore::new(),
            durable,
            settings,
        }
    }

    /// An engine with no durable backing; rehydration never finds anything.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(NoDurableStore), EngineSettings::default())
    }

    pub fn tenants(&self) -> &TenantStore {
        &self.tenants
    }

    /// Index one document and return its id.
    pub async fn ingest_one(&self, tenant: &TenantId, doc: NewDocument) -> Result<String> {
        let slot = self.tenants.get_or_create(tenant).await;
        let mut index = self.lock_hydrated(&slot, RehydrationPolicy::Fail).await?;
        let id = index.insert(doc, None, Utc::now());
        tracing::debug!(tenant = %tenant, id = %id, "ingested document");
        Ok(id)
    }

    /// Index several documents. With a `source`, every existing record of
    /// that source is removed first, so re-uploads replace rather than
    /// accumulate. The replace is atomic with respect to other callers.
    pub async fn ingest_batch(
        &self,
        tenant: &TenantId,
        docs: Vec<NewDocument>,
        source: Option<&str>,
    ) -> Result<Vec<String>> {
        if let Some(src) = source {
            validate_source(src)?;
        }
        let slot = self.tenants.get_or_create(tenant).await;
        let mut index = self.lock_hydrated(&slot, RehydrationPolicy::Fail).await?;

        let replaced = source.map_or(0, |src| index.remove_by_source(src));
        let added_at = Utc::now();
        let ids: Vec<String> = docs
            .into_iter()
            .map(|doc| index.insert(doc, source, added_at))
            .collect();

        tracing::info!(
            tenant = %tenant,
            source = source.unwrap_or("-"),
            added = ids.len(),
            replaced,
            "ingested batch"
        );
        Ok(ids)
    }

    /// Segment a raw upload and index its segments as one source batch.
    pub async fn ingest_raw(
        &self,
        tenant: &TenantId,
        raw: &str,
        source: Option<&str>,
    ) -> Result<Vec<String>> {
        let docs = segment_upload(raw)
            .into_iter()
            .map(|seg| NewDocument {
                content: seg.content,
                category: Some(seg.category),
                title: seg.title,
                tags: Default::default(),
            })
            .collect();
        self.ingest_batch(tenant, docs, source).await
    }

    /// Remove one record. Returns whether it existed.
    pub async fn delete_one(&self, tenant: &TenantId, id: &str) -> bool {
        let Some(slot) = self.tenants.get(tenant).await else {
            return false;
        };
        let removed = slot.lock().await.remove(id);
        tracing::debug!(tenant = %tenant, id = %id, removed, "delete document");
        removed
    }

    /// Remove every record whose source is `source`. Returns the count.
    pub async fn delete_source(&self, tenant: &TenantId, source: &str) -> usize {
        let Some(slot) = self.tenants.get(tenant).await else {
            return 0;
        };
        let removed = slot.lock().await.remove_by_source(source);
        tracing::info!(tenant = %tenant, source = %source, removed, "deleted source");
        removed
    }

    /// Empty a tenant's index. The (empty) index stays registered.
    pub async fn clear_tenant(&self, tenant: &TenantId) {
        let slot = self.tenants.get_or_create(tenant).await;
        let mut index = slot.lock().await;
        let removed = index.len();
        index.clear();
        tracing::info!(tenant = %tenant, removed, "cleared tenant");
    }

    /// Ranked search over one tenant.
    ///
    /// A query with no meaningful terms returns an empty vector without
    /// touching any index.
    pub async fn query(
        &self,
        tenant: &TenantId,
        text: &str,
        opts: &QueryOptions,
    ) -> Result<Vec<RankedResult>> {
        opts.validate()?;
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let (results, candidates) = self
            .read_hydrated(tenant, |index| {
                (rank(index, &tokens, opts, &self.settings.weights), index.len())
            })
            .await?;
        tracing::debug!(
            tenant = %tenant,
            terms = tokens.len(),
            candidates,
            returned = results.len(),
            "query"
        );
        Ok(results)
    }

    /// Number of records in a tenant's index.
    pub async fn count(&self, tenant: &TenantId) -> Result<usize> {
        self.read_hydrated(tenant, TenantIndex::len).await
    }

    /// Summaries of a tenant's records in insertion order.
    pub async fn list(&self, tenant: &TenantId) -> Result<Vec<DocumentSummary>> {
        self.read_hydrated(tenant, |index| {
            index.ordered().into_iter().map(|r| r.summary()).collect()
        })
        .await
    }

    /// Rebuild a tenant from durable storage regardless of its current
    /// state. Sources present in the store are replaced; records without a
    /// stored source are kept. Returns the number of records installed.
    pub async fn rehydrate(&self, tenant: &TenantId) -> Result<usize> {
        if tenant.is_global() {
            return Ok(0);
        }
        let slot = self.tenants.get_or_create(tenant).await;
        let mut index = slot.lock().await;
        self.rehydrate_locked(slot.tenant(), &mut index).await
    }

    /// Drop every tenant. The engine stays usable; indexes start empty.
    pub async fn shutdown(&self) {
        let tenants = self.tenants.tenants().await.len();
        self.tenants.clear_all().await;
        tracing::info!(tenants, "engine shut down");
    }

    /// Run `f` over a tenant's hydrated index without leaving an unknown
    /// tenant registered when it turns out to have nothing.
    async fn read_hydrated<T>(
        &self,
        tenant: &TenantId,
        f: impl FnOnce(&TenantIndex) -> T,
    ) -> Result<T> {
        let (slot, created) = match self.tenants.get(tenant).await {
            Some(slot) => (slot, false),
            None if tenant.is_global() => return Ok(f(&TenantIndex::new())),
            None => self.tenants.get_or_register(tenant).await,
        };
        let read = self
            .lock_hydrated(&slot, self.settings.rehydration_policy)
            .await
            .map(|index| (f(&*index), index.is_empty()));
        if created && !matches!(read, Ok((_, false))) {
            self.tenants.retire_if_unused(slot).await;
        }
        read.map(|(out, _)| out)
    }

    /// Lock `slot`, rehydrating first when the index is empty and has not
    /// been loaded yet.
    async fn lock_hydrated<'a>(
        &self,
        slot: &'a TenantSlot,
        policy: RehydrationPolicy,
    ) -> Result<MutexGuard<'a, TenantIndex>> {
        let mut index = slot.lock().await;
        if !index.is_hydrated() && index.is_empty() && !slot.tenant().is_global() {
            if let Err(e) = self.rehydrate_locked(slot.tenant(), &mut index).await {
                match policy {
                    RehydrationPolicy::Fail => return Err(e),
                    RehydrationPolicy::Degrade => {
                        tracing::warn!(
                            tenant = %slot.tenant(),
                            error = %e,
                            "rehydration failed, continuing without stored context"
                        );
                    }
                }
            }
        }
        Ok(index)
    }

    async fn rehydrate_locked(&self, tenant: &TenantId, index: &mut TenantIndex) -> Result<usize> {
        let staged = fetch_and_stage(
            self.durable.as_ref(),
            tenant,
            index.next_seq(),
            self.settings.rehydrate_timeout,
        )
        .await?;
        index.mark_hydrated();
        if staged.is_empty() {
            return Ok(0);
        }
        let installed = staged.apply(index);
        tracing::info!(tenant = %tenant, records = installed, "rehydrated tenant index");
        Ok(installed)
    }
}

fn validate_source(source: &str) -> Result<()> {
    if source.trim().is_empty() {
        return Err(RecallError::InvalidInput(
            "source must not be empty".to_string(),
        ));
    }
    Ok(())
}
