//! # Profile Recall Core
//!
//! Retrieval engine that supplies relevant prior text (resumes, behavioral
//! answers, transcripts) to a downstream generator. Each tenant (a
//! candidate profile) gets a private in-memory index; queries are ranked
//! with a lexical scorer and bounded to top-K.
//!
//! The in-memory index is a cache. The source of truth is an external
//! [`store::DurableStore`] that keeps raw uploads; an empty index is rebuilt
//! from it on demand ([`rehydrate`]).
//!
//! ```text
//! raw text ─▶ segment ─▶ records ─▶ TenantIndex ◀─ rehydrate ◀─ DurableStore
//!                                        │
//! query ─▶ tokenize ─▶ score ─▶ filter/sort/top-K ─▶ RankedResult
//! ```
//!
//! This crate does no file, network, or database I/O of its own.

pub mod engine;
pub mod error;
pub mod index;
pub mod models;
pub mod rehydrate;
pub mod score;
pub mod search;
pub mod segment;
pub mod store;
pub mod tokenize;

pub use engine::{Engine, EngineSettings};
pub use error::{RecallError, Result};
pub use models::{Category, NewDocument, RankedResult, RawDocument, TenantId};
pub use search::QueryOptions;
