//! `recall query`, `recall count`, `recall list`.
//!
//! Each command opens a fresh engine whose indexes start empty, so the
//! first read of a tenant always rebuilds it from the durable store.

use anyhow::Result;

use profile_recall_core::{Category, QueryOptions, RankedResult, TenantId};

use crate::app::App;
use crate::config::Config;

/// Command-line overrides for a query. Unset fields fall back to
/// `[retrieval]` in the config file.
#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub top_k: Option<usize>,
    pub category: Option<String>,
    pub min_score: Option<f64>,
    pub json: bool,
}

impl QueryArgs {
    pub fn options(&self, config: &Config) -> Result<QueryOptions> {
        let mut opts = config.retrieval.query_options();
        if let Some(k) = self.top_k {
            opts = opts.with_top_k(k);
        }
        if let Some(min) = self.min_score {
            opts = opts.with_min_score(min);
        }
        if let Some(ref c) = self.category {
            let category: Category = c.parse()?;
            opts = opts.with_category(category);
        }
        opts.validate()?;
        Ok(opts)
    }
}

pub async fn run_query(config: &Config, tenant: &str, text: &str, args: &QueryArgs) -> Result<()> {
    let tenant: TenantId = tenant.parse()?;
    let opts = args.options(config)?;

    let app = App::open(config).await?;
    let results = app.engine.query(&tenant, text, &opts).await;
    app.close().await;
    let results = results?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    print_results(&results);
    Ok(())
}

fn print_results(results: &[RankedResult]) {
    for (i, result) in results.iter().enumerate() {
        let meta = &result.metadata;
        let title = meta.title.as_deref().unwrap_or("(untitled)");
        println!("{}. [{:.2}] {} / {}", i + 1, result.score, meta.category, title);
        println!("    added: {}", meta.added_at.format("%Y-%m-%d %H:%M:%S"));
        if let Some(ref source) = meta.source {
            println!("    source: {}", source);
        }
        if !meta.tags.is_empty() {
            let tags: Vec<&str> = meta.tags.iter().map(String::as_str).collect();
            println!("    tags: {}", tags.join(", "));
        }
        println!("    excerpt: \"{}\"", excerpt(&result.content, 160));
        println!("    id: {}", result.id);
        println!();
    }
}

/// First `max_chars` characters of `content` on one line.
fn excerpt(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

pub async fn run_count(config: &Config, tenant: &str) -> Result<()> {
    let tenant: TenantId = tenant.parse()?;
    let app = App::open(config).await?;
    let count = app.engine.count(&tenant).await;
    app.close().await;
    println!("{}", count?);
    Ok(())
}

pub async fn run_list(config: &Config, tenant: &str, json: bool) -> Result<()> {
    let tenant: TenantId = tenant.parse()?;
    let app = App::open(config).await?;
    let summaries = app.engine.list(&tenant).await;
    app.close().await;
    let summaries = summaries?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if summaries.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    println!(
        "{:<32} {:<11} {:>6}  {:<24} TITLE",
        "ID", "CATEGORY", "TOKENS", "SOURCE"
    );
    println!("{}", "-".repeat(96));
    for s in &summaries {
        println!(
            "{:<32} {:<11} {:>6}  {:<24} {}",
            s.id,
            s.category,
            s.token_count,
            s.source.as_deref().unwrap_or("-"),
            s.title.as_deref().unwrap_or("(untitled)")
        );
    }
    println!();
    println!("{} documents", summaries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        toml::from_str("[db]\npath = \"x.sqlite\"\n[retrieval]\ntop_k = 7\n").unwrap()
    }

    #[test]
    fn test_options_fall_back_to_config() {
        let opts = QueryArgs::default().options(&config()).unwrap();
        assert_eq!(opts.top_k, 7);
        assert!(opts.category.is_none());
        assert!((opts.min_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_options_overrides() {
        let args = QueryArgs {
            top_k: Some(2),
            category: Some("behavioral".to_string()),
            min_score: Some(0.0),
            json: false,
        };
        let opts = args.options(&config()).unwrap();
        assert_eq!(opts.top_k, 2);
        assert_eq!(opts.category, Some(Category::Behavioral));
        assert_eq!(opts.min_score, 0.0);
    }

    #[test]
    fn test_options_reject_bad_values() {
        let bad_category = QueryArgs {
            category: Some("hobbies".to_string()),
            ..Default::default()
        };
        assert!(bad_category.options(&config()).is_err());

        let zero_k = QueryArgs {
            top_k: Some(0),
            ..Default::default()
        };
        assert!(zero_k.options(&config()).is_err());
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("a\n  b\tc", 10), "a b c");
        assert_eq!(excerpt("abcdefghij", 4), "abcd...");
    }
}
