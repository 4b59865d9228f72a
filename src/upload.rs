//! `recall upload`: persist text files for a tenant and index them.
//!
//! A path may be a single file or a directory. Directories are walked
//! recursively and only `.md`, `.markdown`, `.txt`, and `.text` files are
//! taken; hidden entries are skipped. Each file's source key is its path
//! relative to the walked root, so re-uploading the same tree replaces
//! earlier records instead of duplicating them.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use profile_recall_core::{RawDocument, TenantId};

use crate::app::{file_type_for, App};
use crate::config::Config;

/// A file selected for upload with its source key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub path: PathBuf,
    pub filename: String,
}

pub async fn run_upload(config: &Config, tenant: &str, path: &Path) -> Result<()> {
    let tenant: TenantId = tenant.parse()?;
    let files = collect_files(path)?;
    if files.is_empty() {
        println!("No uploadable files under {}.", path.display());
        return Ok(());
    }

    let app = App::open(config).await?;
    let mut records = 0usize;
    let mut unchanged = 0usize;

    println!("upload {} ({} files)", tenant, files.len());
    for file in &files {
        let content = std::fs::read_to_string(&file.path)
            .with_context(|| format!("Failed to read {} as UTF-8 text", file.path.display()))?;
        let file_type = file_type_for(&file.filename).unwrap_or("text/plain");
        let report = app
            .upload(
                &tenant,
                RawDocument {
                    filename: file.filename.clone(),
                    content,
                    file_type: file_type.to_string(),
                },
            )
            .await?;
        if report.stored == "unchanged" {
            unchanged += 1;
        }
        records += report.document_ids.len();
        println!(
            "  {} [{}] {} records",
            report.filename,
            report.stored,
            report.document_ids.len()
        );
    }
    println!("  records indexed: {}", records);
    println!("  unchanged files: {}", unchanged);
    println!("ok");

    app.close().await;
    Ok(())
}

/// `recall remove`: forget one uploaded file, or every upload of a tenant.
pub async fn run_remove(
    config: &Config,
    tenant: &str,
    filename: Option<&str>,
    all: bool,
) -> Result<()> {
    let tenant: TenantId = tenant.parse()?;
    let app = App::open(config).await?;

    let outcome = match (filename, all) {
        (Some(name), false) => app.remove_source(&tenant, name).await.map(|report| {
            if !report.stored_removed && report.records_removed == 0 {
                println!("No upload named {} for {}.", name, tenant);
            } else {
                println!("remove {} / {}", tenant, name);
                println!("  stored upload removed: {}", report.stored_removed);
                println!("  records removed: {}", report.records_removed);
                println!("ok");
            }
        }),
        (None, true) => app.purge_tenant(&tenant).await.map(|removed| {
            println!("remove {} (all)", tenant);
            println!("  stored uploads removed: {}", removed);
            println!("ok");
        }),
        _ => Err(anyhow::anyhow!("Pass either a filename or --all")),
    };

    app.close().await;
    outcome
}

/// Resolve `path` into the files to upload, sorted by source key.
pub fn collect_files(path: &Path) -> Result<Vec<UploadFile>> {
    if !path.exists() {
        bail!("Upload path does not exist: {}", path.display());
    }

    if path.is_file() {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Unsupported file name: {}", path.display()))?
            .to_string();
        if file_type_for(&filename).is_none() {
            bail!(
                "Unsupported file type: {} (expected .md, .markdown, .txt)",
                path.display()
            );
        }
        return Ok(vec![UploadFile {
            path: path.to_path_buf(),
            filename,
        }]);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(path)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if file_type_for(&rel).is_none() {
            continue;
        }
        files.push(UploadFile {
            path: entry.path().to_path_buf(),
            filename: rel,
        });
    }

    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}
