//! Splits uploaded files into question/answer-sized segments.
//!
//! An uploaded file usually holds several logical units (one interview
//! answer per heading, a numbered list of accomplishments, ...). Indexing
//! each unit as its own record lets ranking and top-K operate at that
//! granularity rather than on whole files.
//!
//! # Algorithm
//!
//! 1. Split on markdown heading markers.
//! 2. Split every fragment on `Q:` / `Question:` line prefixes.
//! 3. Split on horizontal rules.
//! 4. Split on numbered-list markers.
//! 5. Trim, drop fragments shorter than [`MIN_SEGMENT_CHARS`].
//! 6. Title = first line (≤ [`MAX_TITLE_CHARS`]), category = [`classify`].
//!
//! The matched markers themselves are dropped.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Category;
use crate::tokenize::tokenize;

/// Fragments shorter than this (in characters) are discarded.
pub const MIN_SEGMENT_CHARS: usize = 50;

/// Titles are truncated to this many characters.
pub const MAX_TITLE_CHARS: usize = 100;

static SPLIT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)^[ \t]*#{1,6}[ \t]+",
        r"(?mi)^[ \t]*(?:q|question):",
        r"(?m)^[ \t]*(?:-{3,}|\*{3,}|_{3,})[ \t]*$",
        r"(?m)^[ \t]*\d+[.)][ \t]+",
    ]
    .iter()
    .filter_map(|p| match Regex::new(p) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern = %p, error = %e, "segment pattern failed to compile");
            None
        }
    })
    .collect()
});

const BEHAVIORAL_PHRASES: &[&str] = &[
    "tell me about a time",
    "describe a time",
    "describe a situation",
    "give me an example",
    "walk me through a time",
    "star method",
    "led a team",
    "led the team",
];

const BEHAVIORAL_TERMS: &[&str] = &[
    "behavioral",
    "challenge",
    "challenging",
    "conflict",
    "situation",
    "leadership",
    "failure",
    "mistake",
    "disagree",
    "disagreement",
    "teamwork",
    "mentored",
    "mentoring",
    "stakeholder",
    "stakeholders",
];

const TECHNICAL_PHRASES: &[&str] = &["system design", "data structure"];

const TECHNICAL_TERMS: &[&str] = &[
    "javascript",
    "typescript",
    "python",
    "java",
    "rust",
    "golang",
    "kotlin",
    "swift",
    "react",
    "angular",
    "vue",
    "node",
    "nodejs",
    "django",
    "flask",
    "spring",
    "framework",
    "frameworks",
    "api",
    "apis",
    "rest",
    "graphql",
    "grpc",
    "database",
    "databases",
    "sql",
    "postgres",
    "postgresql",
    "mysql",
    "mongodb",
    "redis",
    "kafka",
    "docker",
    "kubernetes",
    "aws",
    "gcp",
    "azure",
    "algorithm",
    "algorithms",
    "microservices",
    "backend",
    "frontend",
];

const PROJECT_TERMS: &[&str] = &["project", "projects"];

/// One coherent unit of an uploaded file, ready to become a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub content: String,
    pub title: Option<String>,
    pub category: Category,
}

/// Split raw text into segments; fragments under the minimum length vanish.
pub fn segment(raw: &str) -> Vec<Segment> {
    let mut fragments: Vec<&str> = vec![raw];
    for pattern in SPLIT_PATTERNS.iter() {
        fragments = fragments
            .into_iter()
            .flat_map(|f| pattern.split(f))
            .collect();
    }

    fragments
        .into_iter()
        .map(str::trim)
        .filter(|f| f.chars().count() >= MIN_SEGMENT_CHARS)
        .map(to_segment)
        .collect()
}

/// Segment an upload, falling back to the whole trimmed text when no
/// fragment survives. Used for both first ingestion and rehydration so the
/// two paths produce the same records.
pub fn segment_upload(raw: &str) -> Vec<Segment> {
    let segments = segment(raw);
    if !segments.is_empty() {
        return segments;
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Vec::new()
    } else {
        vec![to_segment(trimmed)]
    }
}

fn to_segment(fragment: &str) -> Segment {
    Segment {
        content: fragment.to_string(),
        title: derive_title(fragment),
        category: classify(fragment),
    }
}

/// First non-empty line, truncated to [`MAX_TITLE_CHARS`].
pub fn derive_title(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.chars().take(MAX_TITLE_CHARS).collect())
}

/// Best-effort keyword classification. Behavioral cues win over technical
/// terms, which win over project mentions.
pub fn classify(text: &str) -> Category {
    let lower = text.to_lowercase();
    let tokens: HashSet<String> = tokenize(&lower).into_iter().collect();
    let has_term = |terms: &[&str]| terms.iter().any(|t| tokens.contains(*t));
    let has_phrase = |phrases: &[&str]| phrases.iter().any(|p| lower.contains(p));

    if has_phrase(BEHAVIORAL_PHRASES) || has_term(BEHAVIORAL_TERMS) {
        Category::Behavioral
    } else if has_phrase(TECHNICAL_PHRASES) || has_term(TECHNICAL_TERMS) {
        Category::Technical
    } else if has_term(PROJECT_TERMS) {
        Category::Project
    } else {
        Category::General
    }
}
