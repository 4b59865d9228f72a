//! # Profile Recall CLI (`recall`)
//!
//! The `recall` binary stores candidate-profile uploads (resumes, prepared
//! behavioral answers, transcripts) and answers ranked context queries over
//! them, per tenant.
//!
//! ## Usage
//!
//! ```bash
//! recall --config ./config/recall.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recall init` | Create the SQLite database and schema |
//! | `recall upload --tenant <id> <path>` | Store and index `.md`/`.txt` files |
//! | `recall remove --tenant <id> <filename>` | Forget one upload (or `--all`) |
//! | `recall query --tenant <id> "<text>"` | Ranked search over a tenant |
//! | `recall count --tenant <id>` | Number of indexed documents |
//! | `recall list --tenant <id>` | Document summaries |
//! | `recall serve` | Start the HTTP server |
//! | `recall completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! recall init
//! recall upload --tenant alice ./profiles/alice
//! recall query --tenant alice "led a team through a migration" --top-k 3
//! recall query --tenant alice "conflict" --category behavioral --json
//! recall serve
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use profile_recall::query::QueryArgs;
use profile_recall::{config, migrate, query, server, upload};

/// Profile Recall: per-tenant context retrieval over stored profile uploads.
///
/// All commands except `completions` read a TOML configuration file given
/// by `--config`. See `config/recall.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "recall",
    about = "Profile Recall: per-tenant context retrieval over stored profile uploads",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/recall.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Store text files for a tenant and index them.
    ///
    /// PATH may be a single `.md`/`.markdown`/`.txt` file or a directory,
    /// which is walked recursively. Re-uploading a file replaces the
    /// documents it produced earlier.
    Upload {
        /// Tenant (profile) identifier. `_global` addresses shared documents.
        #[arg(long)]
        tenant: String,

        /// File or directory to upload.
        path: PathBuf,
    },

    /// Forget an uploaded file, or every upload of a tenant.
    Remove {
        #[arg(long)]
        tenant: String,

        /// Filename as reported by `upload` (path relative to the upload root).
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        filename: Option<String>,

        /// Remove every stored upload of the tenant.
        #[arg(long)]
        all: bool,
    },

    /// Ranked search over a tenant's documents.
    Query {
        #[arg(long)]
        tenant: String,

        /// Free-text query.
        query: String,

        /// Maximum number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Only return documents of this category
        /// (`behavioral`, `technical`, `project`, `general`).
        #[arg(long)]
        category: Option<String>,

        /// Minimum score (defaults to `[retrieval].min_score`).
        #[arg(long)]
        min_score: Option<f64>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the number of indexed documents for a tenant.
    Count {
        #[arg(long)]
        tenant: String,
    },

    /// List document summaries for a tenant.
    List {
        #[arg(long)]
        tenant: String,

        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Print shell completions to stdout.
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "profile_recall=debug,profile_recall_core=debug,tower_http=debug"
    } else {
        "profile_recall=info,profile_recall_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Commands that don't require config
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "recall", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload { tenant, path } => {
            upload::run_upload(&cfg, &tenant, &path).await?;
        }
        Commands::Remove {
            tenant,
            filename,
            all,
        } => {
            upload::run_remove(&cfg, &tenant, filename.as_deref(), all).await?;
        }
        Commands::Query {
            tenant,
            query,
            top_k,
            category,
            min_score,
            json,
        } => {
            let args = QueryArgs {
                top_k,
                category,
                min_score,
                json,
            };
            query::run_query(&cfg, &tenant, &query, &args).await?;
        }
        Commands::Count { tenant } => {
            query::run_count(&cfg, &tenant).await?;
        }
        Commands::List { tenant, json } => {
            query::run_list(&cfg, &tenant, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
