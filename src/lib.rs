//! # Profile Recall
//!
//! Stores candidate-profile uploads (resumes, prepared behavioral answers,
//! transcripts) and serves ranked, per-tenant context for a downstream
//! answer generator.
//!
//! Retrieval itself lives in [`profile_recall_core`]; this crate supplies
//! the SQLite durable store the engine rebuilds its indexes from, plus the
//! configuration, CLI, and HTTP surfaces.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────────────┐
//! │  upload   │──▶│    SQLite    │──▶│ profile-recall-   │
//! │ CLI/HTTP  │   │ raw_documents│   │ core Engine       │
//! └───────────┘   └──────────────┘   │ (per-tenant index)│
//!                                    └─────────┬─────────┘
//!                      ┌───────────────────────┤
//!                      ▼                       ▼
//!                 ┌──────────┐           ┌──────────┐
//!                 │   CLI    │           │   HTTP   │
//!                 │ (recall) │           │  (axum)  │
//!                 └──────────┘           └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | `DurableStore` over SQLite |
//! | [`app`] | Engine and store wiring |
//! | [`upload`] | File uploads and removal |
//! | [`query`] | Query, count, and list commands |
//! | [`server`] | HTTP server |

pub mod app;
pub mod config;
pub mod db;
pub mod migrate;
pub mod query;
pub mod server;
pub mod sqlite_store;
pub mod upload;
