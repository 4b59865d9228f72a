//! Per-tenant document indexes and the registry that owns them.
//!
//! [`TenantStore`] maps a [`TenantId`] to a [`TenantSlot`]; each slot guards
//! its [`TenantIndex`] with its own async mutex, so independent tenants never
//! contend. The registry lock is only held to look up or insert a slot.
//!
//! Indexes are created explicitly through [`TenantStore::get_or_create`] by
//! ingestion, clearing, or a rehydration that found stored uploads. A read of
//! a tenant that turns out to have nothing is not left registered. Clearing
//! empties an index but keeps it registered.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::models::{DocumentRecord, Metadata, NewDocument, TenantId};
use crate::segment::classify;

/// Mapping from record id to record, owned by exactly one tenant.
#[derive(Debug, Default)]
pub struct TenantIndex {
    records: HashMap<String, DocumentRecord>,
    next_seq: u64,
    hydrated: bool,
}

impl TenantIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize and store a new record, returning its id.
    pub fn insert(
        &mut self,
        doc: NewDocument,
        source: Option<&str>,
        added_at: DateTime<Utc>,
    ) -> String {
        let category = doc.category.unwrap_or_else(|| classify(&doc.content));
        let metadata = Metadata {
            category,
            title: doc.title,
            tags: doc.tags,
            source: source.map(str::to_string),
            added_at,
        };
        let record = DocumentRecord::new(doc.content, metadata, self.next_seq);
        self.next_seq += 1;
        let id = record.id().to_string();
        self.records.insert(id.clone(), record);
        id
    }

    /// Move already-built records in, keeping their sequence order.
    pub(crate) fn extend(&mut self, records: Vec<DocumentRecord>) {
        for record in records {
            self.next_seq = self.next_seq.max(record.seq() + 1);
            self.records.insert(record.id().to_string(), record);
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.records.remove(id).is_some()
    }

    /// Remove every record whose `metadata.source` equals `source`.
    pub fn remove_by_source(&mut self, source: &str) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, r| r.metadata().source.as_deref() != Some(source));
        before - self.records.len()
    }

    /// Drop every record and forget that durable storage was consulted.
    pub fn clear(&mut self) {
        self.records.clear();
        self.hydrated = false;
    }

    /// Whether durable storage has already been loaded into this index,
    /// including a load that found nothing.
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub(crate) fn mark_hydrated(&mut self) {
        self.hydrated = true;
    }

    pub fn get(&self, id: &str) -> Option<&DocumentRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records.values()
    }

    /// Next sequence number this index would assign.
    pub(crate) fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Records in insertion order.
    pub fn ordered(&self) -> Vec<&DocumentRecord> {
        let mut out: Vec<&DocumentRecord> = self.records.values().collect();
        out.sort_by_key(|r| r.seq());
        out
    }
}

/// Registry entry for one tenant.
#[derive(Debug)]
pub struct TenantSlot {
    tenant: TenantId,
    index: Mutex<TenantIndex>,
}

impl TenantSlot {
    fn new(tenant: TenantId) -> Self {
        Self {
            tenant,
            index: Mutex::new(TenantIndex::new()),
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Exclusive access to this tenant's index. Every read and write goes
    /// through here.
    pub async fn lock(&self) -> MutexGuard<'_, TenantIndex> {
        self.index.lock().await
    }
}

/// Process-wide tenant registry. Construct once and share via `Arc`.
#[derive(Debug, Default)]
pub struct TenantStore {
    slots: RwLock<HashMap<TenantId, Arc<TenantSlot>>>,
}

impl TenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the tenant's slot, creating an empty index on first reference.
    pub async fn get_or_create(&self, tenant: &TenantId) -> Arc<TenantSlot> {
        self.get_or_register(tenant).await.0
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// this call created the slot.
    pub(crate) async fn get_or_register(&self, tenant: &TenantId) -> (Arc<TenantSlot>, bool) {
        if let Some(slot) = self.slots.read().await.get(tenant) {
            return (slot.clone(), false);
        }
        let mut slots = self.slots.write().await;
        let mut created = false;
        let slot = slots
            .entry(tenant.clone())
            .or_insert_with(|| {
                tracing::debug!(tenant = %tenant, "creating tenant index");
                created = true;
                Arc::new(TenantSlot::new(tenant.clone()))
            })
            .clone();
        (slot, created)
    }

    /// Unregister `slot` if it is still the tenant's registered slot, nobody
    /// else holds it, and its index never held a record. Returns whether it
    /// was removed.
    pub(crate) async fn retire_if_unused(&self, slot: Arc<TenantSlot>) -> bool {
        let mut slots = self.slots.write().await;
        // New handles are only handed out under the registry lock, so with it
        // held the registry and `slot` are the only two owners.
        if Arc::strong_count(&slot) != 2 {
            return false;
        }
        match slot.index.try_lock() {
            Ok(index) if index.is_empty() && index.next_seq() == 0 => {}
            _ => return false,
        }
        let registered = slots
            .get(slot.tenant())
            .is_some_and(|s| Arc::ptr_eq(s, &slot));
        if registered {
            slots.remove(slot.tenant());
            tracing::debug!(tenant = %slot.tenant(), "dropped empty tenant index");
        }
        registered
    }

    /// Look up a tenant without creating it.
    pub async fn get(&self, tenant: &TenantId) -> Option<Arc<TenantSlot>> {
        self.slots.read().await.get(tenant).cloned()
    }

    pub async fn tenants(&self) -> Vec<TenantId> {
        let mut out: Vec<TenantId> = self.slots.read().await.keys().cloned().collect();
        out.sort();
        out
    }

    /// Drop every registered tenant. Used at shutdown and between tests.
    pub async fn clear_all(&self) {
        let drained: Vec<Arc<TenantSlot>> = {
            let mut slots = self.slots.write().await;
            slots.drain().map(|(_, s)| s).collect()
        };
        for slot in drained {
            slot.lock().await.clear();
        }
    }
}
