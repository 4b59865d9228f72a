//! Core data models used throughout Profile Recall.
//!
//! These types represent the tenants, documents, and ranked results that flow
//! through the ingestion, rehydration, and query pipeline.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RecallError;
use crate::tokenize::tokenize;

/// Reserved wire name for [`TenantId::Global`].
pub const GLOBAL_TENANT: &str = "_global";

/// Isolation boundary for documents and queries.
///
/// `Global` holds documents that belong to no profile. It is queried like any
/// other tenant but is never rehydrated from durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TenantId {
    Global,
    Profile(String),
}

impl TenantId {
    /// Build a profile tenant, rejecting blank identifiers.
    pub fn profile(id: impl Into<String>) -> Result<Self, RecallError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RecallError::InvalidInput(
                "tenant id must not be empty".to_string(),
            ));
        }
        Ok(TenantId::Profile(id))
    }

    /// Durable-store key for this tenant, or `None` for the global tenant.
    pub fn profile_key(&self) -> Option<&str> {
        match self {
            TenantId::Global => None,
            TenantId::Profile(id) => Some(id),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, TenantId::Global)
    }
}

impl FromStr for TenantId {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == GLOBAL_TENANT {
            Ok(TenantId::Global)
        } else {
            TenantId::profile(s)
        }
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantId::Global => f.write_str(GLOBAL_TENANT),
            TenantId::Profile(id) => f.write_str(id),
        }
    }
}

/// Kind of content a record holds, used for optional query filtering.
///
/// Deserialization goes through [`FromStr`], so it accepts the same
/// spellings as the CLI (case-insensitive, surrounding whitespace ignored).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Category {
    Behavioral,
    Technical,
    Project,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Behavioral => "behavioral",
            Category::Technical => "technical",
            Category::Project => "project",
            Category::General => "general",
        }
    }
}

impl FromStr for Category {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "behavioral" => Ok(Category::Behavioral),
            "technical" => Ok(Category::Technical),
            "project" => Ok(Category::Project),
            "general" => Ok(Category::General),
            other => Err(RecallError::InvalidInput(format!(
                "unknown category '{}': expected behavioral, technical, project, or general",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = RecallError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Structured metadata attached to every [`DocumentRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub category: Category,
    pub title: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Grouping key, typically the originating filename.
    pub source: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Caller-supplied input for a single ingestion.
///
/// A missing `category` is inferred from the content at ingestion time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDocument {
    pub content: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl NewDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// A single indexed unit of text.
///
/// Tokens are computed once in [`DocumentRecord::new`]; there is no way to
/// change `content` afterwards; a changed document is a new record.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    id: String,
    content: String,
    metadata: Metadata,
    tokens: Vec<String>,
    seq: u64,
}

impl DocumentRecord {
    pub(crate) fn new(content: String, metadata: Metadata, seq: u64) -> Self {
        let tokens = tokenize(&content);
        Self {
            id: generate_id(metadata.added_at),
            content,
            metadata,
            tokens,
            seq,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Per-tenant insertion sequence; the final ranking tie-breaker.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            title: self.metadata.title.clone(),
            category: self.metadata.category,
            source: self.metadata.source.clone(),
            added_at: self.metadata.added_at,
            token_count: self.tokens.len(),
        }
    }
}

/// `doc_<unix-millis>_<9 hex chars>`: time-based with a random suffix.
fn generate_id(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("doc_{}_{}", at.timestamp_millis(), &suffix[..9])
}

/// A raw upload as persisted by the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    pub filename: String,
    pub content: String,
    pub file_type: String,
}

/// One entry of a ranked query response.
#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub score: f64,
}

/// Lightweight listing entry, without content.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: Option<String>,
    pub category: Category,
    pub source: Option<String>,
    pub added_at: DateTime<Utc>,
    pub token_count: usize,
}
