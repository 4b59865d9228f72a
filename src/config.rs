use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use profile_recall_core::rehydrate::RehydrationPolicy;
use profile_recall_core::score::ScoringWeights;
use profile_recall_core::search::{QueryOptions, DEFAULT_MIN_SCORE, DEFAULT_TOP_K};
use profile_recall_core::EngineSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub rehydration: RehydrationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// Upper bound on pooled SQLite connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    4
}
fn default_busy_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_base_weight")]
    pub base_weight: f64,
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,
    #[serde(default = "default_tag_weight")]
    pub tag_weight: f64,
    #[serde(default = "default_prefix_weight")]
    pub prefix_weight: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
            base_weight: default_base_weight(),
            title_weight: default_title_weight(),
            tag_weight: default_tag_weight(),
            prefix_weight: default_prefix_weight(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_min_score() -> f64 {
    DEFAULT_MIN_SCORE
}
fn default_base_weight() -> f64 {
    1.0
}
fn default_title_weight() -> f64 {
    2.0
}
fn default_tag_weight() -> f64 {
    1.5
}
fn default_prefix_weight() -> f64 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RehydrationConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub on_error: RehydrationPolicy,
}

impl Default for RehydrationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            on_error: RehydrationPolicy::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl RetrievalConfig {
    pub fn weights(&self) -> ScoringWeights {
        ScoringWeights {
            base: self.base_weight,
            title: self.title_weight,
            tag: self.tag_weight,
            prefix: self.prefix_weight,
            ..ScoringWeights::default()
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::default()
            .with_top_k(self.top_k)
            .with_min_score(self.min_score)
    }
}

impl Config {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            weights: self.retrieval.weights(),
            rehydrate_timeout: Duration::from_secs(self.rehydration.timeout_secs),
            rehydration_policy: self.rehydration.on_error,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate db
    if config.db.max_connections < 1 {
        anyhow::bail!("db.max_connections must be >= 1");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !config.retrieval.min_score.is_finite() || config.retrieval.min_score < 0.0 {
        anyhow::bail!("retrieval.min_score must be a finite number >= 0");
    }
    for (name, w) in [
        ("base_weight", config.retrieval.base_weight),
        ("title_weight", config.retrieval.title_weight),
        ("tag_weight", config.retrieval.tag_weight),
        ("prefix_weight", config.retrieval.prefix_weight),
    ] {
        if !w.is_finite() || w < 0.0 {
            anyhow::bail!("retrieval.{} must be a finite number >= 0", name);
        }
    }

    // Validate rehydration
    if config.rehydration.timeout_secs == 0 {
        anyhow::bail!("rehydration.timeout_secs must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<Config> {
        let config: Config = toml::from_str(s)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse("[db]\npath = \"./data/recall.sqlite\"\n").unwrap();
        assert_eq!(config.db.max_connections, 4);
        assert_eq!(config.db.busy_timeout_secs, 5);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.min_score - 0.5).abs() < 1e-9);
        assert_eq!(config.retrieval.weights(), ScoringWeights::default());
        assert_eq!(config.rehydration.timeout_secs, 30);
        assert_eq!(config.rehydration.on_error, RehydrationPolicy::Fail);
        assert_eq!(config.server.bind, "127.0.0.1:7341");
    }

    #[test]
    fn test_overrides() {
        let config = parse(
            r#"
[db]
path = "x.sqlite"
max_connections = 1
busy_timeout_secs = 0

[retrieval]
top_k = 8
title_weight = 3.0

[rehydration]
timeout_secs = 5
on_error = "degrade"
"#,
        )
        .unwrap();
        let settings = config.engine_settings();
        assert_eq!(config.db.max_connections, 1);
        assert_eq!(config.db.busy_timeout_secs, 0);
        assert_eq!(config.retrieval.query_options().top_k, 8);
        assert!((settings.weights.title - 3.0).abs() < 1e-9);
        assert_eq!(settings.rehydrate_timeout, Duration::from_secs(5));
        assert_eq!(settings.rehydration_policy, RehydrationPolicy::Degrade);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(parse("[db]\npath = \"x\"\n[retrieval]\ntop_k = 0\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[retrieval]\nmin_score = -1.0\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[retrieval]\ntag_weight = -0.5\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[rehydration]\ntimeout_secs = 0\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[rehydration]\non_error = \"ignore\"\n").is_err());
        assert!(parse("[retrieval]\ntop_k = 3\n").is_err());
        assert!(parse("[db]\npath = \"x\"\nmax_connections = 0\n").is_err());
    }
}
