//! Lazy reconstruction of a tenant index from durable storage.
//!
//! The in-memory index is a cache. After a restart (or on first access) a
//! tenant's index is empty even though the durable store still holds every
//! raw upload. Rehydration fetches those uploads, runs them through the same
//! [`segment_upload`] path used at first ingestion, and installs the result
//! with `source = filename` so later deletes by filename keep working.
//!
//! Rehydration is all-or-nothing: records are staged in a local vector and
//! merged into the index only after the fetch and every upload succeeded.
//! The caller holds the tenant's lock for the whole operation, so concurrent
//! requests for the same tenant wait instead of fetching again.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Deserialize;

use crate::error::{RecallError, Result};
use crate::index::TenantIndex;
use crate::models::{DocumentRecord, Metadata, RawDocument, TenantId};
use crate::segment::segment_upload;
use crate::store::DurableStore;

/// What a query does when rehydration fails.
///
/// Ingestion always fails: indexing on top of a half-known tenant would hide
/// the missing uploads until the next restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RehydrationPolicy {
    /// Return the error to the caller.
    #[default]
    Fail,
    /// Log a warning and answer from the (empty) index.
    Degrade,
}

/// Records built from durable uploads, not yet visible to queries.
#[derive(Debug, Default)]
pub struct Staged {
    records: Vec<DocumentRecord>,
    sources: Vec<String>,
}

impl Staged {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace each staged source in `index` with the staged records.
    pub fn apply(self, index: &mut TenantIndex) -> usize {
        for source in &self.sources {
            index.remove_by_source(source);
        }
        let n = self.records.len();
        index.extend(self.records);
        n
    }
}

/// Segment raw uploads into records numbered from `first_seq`.
///
/// A filename that appears twice keeps only its last upload, matching what
/// two source-replacing batches would leave behind.
pub fn stage(uploads: Vec<RawDocument>, first_seq: u64) -> Staged {
    let mut by_source: Vec<(String, Vec<DocumentRecord>)> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut seq = first_seq;
    let added_at = Utc::now();

    for upload in uploads {
        let records: Vec<DocumentRecord> = segment_upload(&upload.content)
            .into_iter()
            .map(|seg| {
                let record = DocumentRecord::new(
                    seg.content,
                    Metadata {
                        category: seg.category,
                        title: seg.title,
                        tags: Default::default(),
                        source: Some(upload.filename.clone()),
                        added_at,
                    },
                    seq,
                );
                seq += 1;
                record
            })
            .collect();

        match position.get(&upload.filename) {
            Some(&i) => by_source[i].1 = records,
            None => {
                position.insert(upload.filename.clone(), by_source.len());
                by_source.push((upload.filename, records));
            }
        }
    }

    let mut staged = Staged::default();
    for (source, records) in by_source {
        staged.sources.push(source);
        staged.records.extend(records);
    }
    staged
}

/// Fetch and stage every upload of `tenant`, bounded by `timeout`.
///
/// The global tenant has no durable uploads and always stages nothing.
pub async fn fetch_and_stage(
    durable: &dyn DurableStore,
    tenant: &TenantId,
    first_seq: u64,
    timeout: Duration,
) -> Result<Staged> {
    let Some(key) = tenant.profile_key() else {
        return Ok(Staged::default());
    };

    let started = Instant::now();
    let uploads = match tokio::time::timeout(timeout, durable.fetch_raw_documents(key)).await {
        Ok(Ok(uploads)) => uploads,
        Ok(Err(e)) => {
            return Err(RecallError::Rehydration {
                tenant: key.to_string(),
                source: e,
            })
        }
        Err(_) => {
            return Err(RecallError::RehydrationTimeout {
                tenant: key.to_string(),
                after: timeout,
            })
        }
    };

    let upload_count = uploads.len();
    let staged = stage(uploads, first_seq);
    tracing::debug!(
        tenant = %tenant,
        uploads = upload_count,
        records = staged.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "staged rehydration"
    );
    Ok(staged)
}
