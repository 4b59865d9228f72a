//! Error type for the core engine.
//!
//! The only I/O the core performs is the durable-store read during
//! rehydration. "No matches" and "unknown tenant" are ordinary empty
//! results, not errors.

use std::time::Duration;

/// Errors surfaced by [`Engine`](crate::engine::Engine) operations.
#[derive(Debug, thiserror::Error)]
pub enum RecallError {
    /// Caller contract violation, rejected at the boundary.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The durable store failed while rebuilding a tenant's index.
    /// The index was left untouched.
    #[error("rehydration failed for tenant '{tenant}': {source}")]
    Rehydration {
        tenant: String,
        #[source]
        source: anyhow::Error,
    },

    /// The durable store did not answer within the configured deadline.
    #[error("rehydration for tenant '{tenant}' timed out after {after:?}")]
    RehydrationTimeout { tenant: String, after: Duration },
}

impl RecallError {
    pub fn is_rehydration(&self) -> bool {
        matches!(
            self,
            RecallError::Rehydration { .. } | RecallError::RehydrationTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RecallError>;
