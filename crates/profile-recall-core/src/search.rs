//! Ranking over a single tenant index.
//!
//! Scores every candidate with [`score`](crate::score::score), applies the
//! category filter and score floor, sorts, and truncates to `top_k`.
//!
//! Ordering is fully explicit: score descending, then `added_at` ascending,
//! then insertion sequence ascending. Map iteration order never leaks into
//! results.

use std::cmp::Ordering;

use crate::error::{RecallError, Result};
use crate::index::TenantIndex;
use crate::models::{Category, DocumentRecord, RankedResult};
use crate::score::{score, ScoringWeights};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MIN_SCORE: f64 = 0.5;

/// Per-query filter and limit options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOptions {
    pub top_k: usize,
    pub category: Option<Category>,
    pub min_score: f64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            category: None,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

impl QueryOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RecallError::InvalidInput("top_k must be >= 1".to_string()));
        }
        if !self.min_score.is_finite() || self.min_score < 0.0 {
            return Err(RecallError::InvalidInput(format!(
                "min_score must be a finite number >= 0, got {}",
                self.min_score
            )));
        }
        Ok(())
    }
}

/// Rank `index` against a non-empty tokenized query.
pub fn rank(
    index: &TenantIndex,
    query_tokens: &[String],
    opts: &QueryOptions,
    weights: &ScoringWeights,
) -> Vec<RankedResult> {
    let mut kept: Vec<(&DocumentRecord, f64)> = index
        .records()
        .filter(|r| opts.category.map_or(true, |c| r.metadata().category == c))
        .map(|r| (r, score(query_tokens, r, weights)))
        .filter(|(_, s)| *s >= opts.min_score)
        .collect();

    kept.sort_by(|(ra, sa), (rb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then(ra.metadata().added_at.cmp(&rb.metadata().added_at))
            .then(ra.seq().cmp(&rb.seq()))
    });
    kept.truncate(opts.top_k);

    kept.into_iter()
        .map(|(r, s)| RankedResult {
            id: r.id().to_string(),
            content: r.content().to_string(),
            metadata: r.metadata().clone(),
            score: s,
        })
        .collect()
}
