use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn recall_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_recall"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("resume.md"),
        "# Leadership\n\nI led a team of five engineers through a database migration and mentored two junior developers.\n\n# Kubernetes\n\nMoved the billing platform onto Kubernetes, cutting deployment time from hours to minutes.\n",
    )
    .unwrap();
    fs::write(
        files_dir.join("notes.txt"),
        "Prepared notes on resolving disagreements with stakeholders during design reviews and sprint planning.",
    )
    .unwrap();
    fs::write(files_dir.join("photo.png"), [0u8, 159, 146, 150]).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/recall.sqlite"

[retrieval]
top_k = 5
min_score = 0.5

[rehydration]
timeout_secs = 10
"#,
        root.display()
    );

    let config_path = config_dir.join("recall.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn files_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("files")
}

fn run_recall(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = recall_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run recall binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn upload_all(config_path: &Path, tenant: &str) -> String {
    let dir = files_dir(config_path);
    let (stdout, stderr, success) = run_recall(
        config_path,
        &["upload", "--tenant", tenant, dir.to_str().unwrap()],
    );
    assert!(success, "upload failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

fn count(config_path: &Path, tenant: &str) -> usize {
    let (stdout, stderr, success) = run_recall(config_path, &["count", "--tenant", tenant]);
    assert!(success, "count failed: stdout={}, stderr={}", stdout, stderr);
    stdout.trim().parse().unwrap()
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_recall(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    let (_, _, again) = run_recall(&config_path, &["init"]);
    assert!(again, "Second init failed (not idempotent)");
}

#[test]
fn test_upload_skips_unsupported_files() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["init"]);

    let stdout = upload_all(&config_path, "alice");
    assert!(stdout.contains("(2 files)"), "stdout={}", stdout);
    assert!(stdout.contains("resume.md [inserted] 2 records"));
    assert!(stdout.contains("notes.txt [inserted] 1 records"));
    assert!(!stdout.contains("photo.png"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_cold_count_rehydrates_from_store() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["init"]);
    upload_all(&config_path, "alice");

    // Each invocation is a new process with empty indexes
    assert_eq!(count(&config_path, "alice"), 3);
    assert_eq!(count(&config_path, "bob"), 0);
}

#[test]
fn test_query_ranks_uploaded_segments() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["init"]);
    upload_all(&config_path, "alice");

    let (stdout, stderr, success) = run_recall(
        &config_path,
        &["query", "--tenant", "alice", "led team migration"],
    );
    assert!(success, "query failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.starts_with("1. ["), "stdout={}", stdout);
    assert!(stdout.contains("behavioral / Leadership"));
    assert!(stdout.contains("source: resume.md"));
}

#[test]
fn test_query_json_output() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["init"]);
    upload_all(&config_path, "alice");

    let (stdout, stderr, success) = run_recall(
        &config_path,
        &[
            "query",
            "--tenant",
            "alice",
            "kubernetes deployment",
            "--top-k",
            "1",
            "--json",
        ],
    );
    assert!(success, "query failed: stdout={}, stderr={}", stdout, stderr);

    let results: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["metadata"]["title"], "Kubernetes");
    assert_eq!(results[0]["metadata"]["source"], "resume.md");
    assert!(results[0]["score"].as_f64().unwrap() > 0.5);
}

#[test]
fn test_query_category_filter() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["init"]);
    upload_all(&config_path, "alice");

    let (stdout, _, success) = run_recall(
        &config_path,
        &[
            "query",
            "--tenant",
            "alice",
            "kubernetes deployment",
            "--category",
            "behavioral",
        ],
    );
    assert!(success);
    assert!(stdout.contains("No results."), "stdout={}", stdout);

    let (_, stderr, success) = run_recall(
        &config_path,
        &["query", "--tenant", "alice", "anything", "--category", "hobbies"],
    );
    assert!(!success);
    assert!(stderr.contains("unknown category"), "stderr={}", stderr);
}

#[test]
fn test_tenants_are_isolated() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["init"]);
    upload_all(&config_path, "alice");

    let (stdout, _, success) = run_recall(
        &config_path,
        &["query", "--tenant", "bob", "led team migration"],
    );
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_reupload_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["init"]);
    upload_all(&config_path, "alice");

    let stdout = upload_all(&config_path, "alice");
    assert!(stdout.contains("resume.md [unchanged]"));
    assert!(stdout.contains("unchanged files: 2"));
    assert_eq!(count(&config_path, "alice"), 3);
}

#[test]
fn test_remove_file_and_all() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["init"]);
    upload_all(&config_path, "alice");

    let (stdout, stderr, success) = run_recall(
        &config_path,
        &["remove", "--tenant", "alice", "resume.md"],
    );
    assert!(success, "remove failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("stored upload removed: true"));
    assert_eq!(count(&config_path, "alice"), 1);

    let (stdout, _, success) = run_recall(
        &config_path,
        &["remove", "--tenant", "alice", "resume.md"],
    );
    assert!(success);
    assert!(stdout.contains("No upload named resume.md"));

    let (stdout, _, success) = run_recall(&config_path, &["remove", "--tenant", "alice", "--all"]);
    assert!(success);
    assert!(stdout.contains("stored uploads removed: 1"));
    assert_eq!(count(&config_path, "alice"), 0);
}

#[test]
fn test_list_documents() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["init"]);
    upload_all(&config_path, "alice");

    let (stdout, stderr, success) = run_recall(&config_path, &["list", "--tenant", "alice", "--json"]);
    assert!(success, "list failed: stdout={}, stderr={}", stdout, stderr);
    let docs: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let docs = docs.as_array().unwrap();
    assert_eq!(docs.len(), 3);
    assert!(docs.iter().all(|d| d["id"].as_str().unwrap().starts_with("doc_")));

    let (stdout, _, success) = run_recall(&config_path, &["list", "--tenant", "alice"]);
    assert!(success);
    assert!(stdout.contains("3 documents"));
}

#[test]
fn test_invalid_tenant_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_recall(&config_path, &["init"]);

    let (_, stderr, success) = run_recall(&config_path, &["count", "--tenant", "  "]);
    assert!(!success);
    assert!(stderr.contains("tenant id must not be empty"), "stderr={}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_recall(&tmp.path().join("nope.toml"), &["count", "--tenant", "a"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_completions() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, _, success) = run_recall(&config_path, &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("recall"));
}
