//! Lexical relevance scoring.
//!
//! # Scoring
//!
//! For a tokenized query `q` and a record `r`:
//!
//! 1. Every query token present in `r`'s token set earns `base`, plus
//!    `title` if it occurs in the lowercased title, plus `tag` if any
//!    lowercased tag contains it.
//! 2. Every (query token, record token) pair where one is a prefix of the
//!    other earns `prefix` ("lead" vs "leadership").
//! 3. The sum is divided by `ln(token_count + 10) / 10`, discounting long
//!    records relative to short, focused ones.
//!
//! The weights are empirical and exposed through [`ScoringWeights`].

use std::collections::HashSet;

use crate::models::DocumentRecord;

/// Tunable scoring constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub base: f64,
    pub title: f64,
    pub tag: f64,
    pub prefix: f64,
    /// Added to the token count inside the length-normalization logarithm.
    pub length_offset: f64,
    /// Divisor applied to the logarithm.
    pub length_divisor: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 1.0,
            title: 2.0,
            tag: 1.5,
            prefix: 0.5,
            length_offset: 10.0,
            length_divisor: 10.0,
        }
    }
}

/// Score `record` against already-tokenized `query_tokens`.
pub fn score(query_tokens: &[String], record: &DocumentRecord, weights: &ScoringWeights) -> f64 {
    let tokens = record.tokens();
    let token_set: HashSet<&str> = tokens.iter().map(String::as_str).collect();
    let meta = record.metadata();
    let title = meta.title.as_deref().map(str::to_lowercase);
    let tags: Vec<String> = meta.tags.iter().map(|t| t.to_lowercase()).collect();

    let mut total = 0.0;

    for qt in query_tokens {
        if token_set.contains(qt.as_str()) {
            total += weights.base;
            if title.as_deref().is_some_and(|t| t.contains(qt.as_str())) {
                total += weights.title;
            }
            if tags.iter().any(|t| t.contains(qt.as_str())) {
                total += weights.tag;
            }
        }
    }

    for qt in query_tokens {
        for rt in tokens {
            if rt.starts_with(qt.as_str()) || qt.starts_with(rt.as_str()) {
                total += weights.prefix;
            }
        }
    }

    total / length_norm(tokens.len(), weights)
}

fn length_norm(token_count: usize, weights: &ScoringWeights) -> f64 {
    (token_count as f64 + weights.length_offset).ln() / weights.length_divisor
}
