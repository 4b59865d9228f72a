use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use profile_recall::config::Config;
use profile_recall::sqlite_store::{SqliteDurableStore, UpsertOutcome};
use profile_recall::{db, migrate};
use profile_recall_core::store::DurableStore;
use profile_recall_core::{Engine, EngineSettings, QueryOptions, RawDocument, TenantId};

fn test_config(tmp: &TempDir) -> Config {
    let path = tmp.path().join("data").join("recall.sqlite");
    toml::from_str(&format!("[db]\npath = {:?}\n", path.display().to_string())).unwrap()
}

async fn open_store(tmp: &TempDir) -> SqliteDurableStore {
    let config = test_config(tmp);
    let pool = db::connect(&config).await.unwrap();
    migrate::migrate_pool(&pool).await.unwrap();
    SqliteDurableStore::new(pool)
}

fn raw(filename: &str, content: &str) -> RawDocument {
    RawDocument {
        filename: filename.to_string(),
        content: content.to_string(),
        file_type: "text/markdown".to_string(),
    }
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    migrate::run_migrations(&config).await.unwrap();
    migrate::run_migrations(&config).await.unwrap();
    assert!(config.db.path.exists());
}

#[tokio::test]
async fn test_upsert_and_fetch_in_upload_order() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let outcome = store
        .upsert_raw_document("alice", &raw("resume.md", "first"))
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Inserted);
    store
        .upsert_raw_document("alice", &raw("answers.md", "second"))
        .await
        .unwrap();
    store
        .upsert_raw_document("bob", &raw("resume.md", "bob's"))
        .await
        .unwrap();

    let docs = store.fetch_raw_documents("alice").await.unwrap();
    let names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
    assert_eq!(names, vec!["resume.md", "answers.md"]);
    assert_eq!(docs[0].content, "first");
    assert_eq!(docs[0].file_type, "text/markdown");

    assert!(store.fetch_raw_documents("nobody").await.unwrap().is_empty());
    assert_eq!(store.list_tenants().await.unwrap(), vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_reupload_replaces_or_skips() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .upsert_raw_document("alice", &raw("resume.md", "v1"))
        .await
        .unwrap();
    let same = store
        .upsert_raw_document("alice", &raw("resume.md", "v1"))
        .await
        .unwrap();
    assert_eq!(same, UpsertOutcome::Unchanged);

    let changed = store
        .upsert_raw_document("alice", &raw("resume.md", "v2"))
        .await
        .unwrap();
    assert_eq!(changed, UpsertOutcome::Updated);

    let docs = store.fetch_raw_documents("alice").await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content, "v2");
}

#[tokio::test]
async fn test_delete_document_and_tenant() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .upsert_raw_document("alice", &raw("a.md", "a"))
        .await
        .unwrap();
    store
        .upsert_raw_document("alice", &raw("b.md", "b"))
        .await
        .unwrap();

    assert!(store.delete_raw_document("alice", "a.md").await.unwrap());
    assert!(!store.delete_raw_document("alice", "a.md").await.unwrap());
    assert_eq!(store.fetch_raw_documents("alice").await.unwrap().len(), 1);

    assert_eq!(store.delete_tenant("alice").await.unwrap(), 1);
    assert_eq!(store.delete_tenant("alice").await.unwrap(), 0);
    assert!(store.list_tenants().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_engine_rehydrates_from_sqlite() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(open_store(&tmp).await);
    store
        .upsert_raw_document(
            "alice",
            &raw(
                "resume.md",
                "# Leadership\n\nI led a team of five engineers through a database migration and mentored two juniors.\n",
            ),
        )
        .await
        .unwrap();

    let settings = EngineSettings {
        rehydrate_timeout: Duration::from_secs(5),
        ..EngineSettings::default()
    };
    let engine = Engine::new(store.clone(), settings);
    let alice = TenantId::profile("alice").unwrap();

    let results = engine
        .query(&alice, "led team migration", &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].metadata.title.as_deref(), Some("Leadership"));
    assert_eq!(results[0].metadata.source.as_deref(), Some("resume.md"));
    assert_eq!(engine.count(&alice).await.unwrap(), 1);
}
