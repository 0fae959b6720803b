//! File-backed SQLite store behind the metadata and settings stores.

use std::sync::Arc;

use tempfile::TempDir;
use tidymark_db::{
    KeyValueStore, MetadataPatch, MetadataStore, Settings, SettingsStore, SqliteKvStore,
};

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("tidymark.db").display())
}

#[tokio::test]
async fn test_metadata_survives_reconnect() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);

    {
        let kv = SqliteKvStore::connect(&url).await.unwrap();
        let store = MetadataStore::new(Arc::new(kv));
        store
            .update("1", MetadataPatch::default().with_category("Tech").with_tags(["rust"]))
            .await
            .unwrap();
        store.refresh_aggregates().await.unwrap();
    }

    let kv = SqliteKvStore::connect(&url).await.unwrap();
    let store = MetadataStore::new(Arc::new(kv));
    let record = store.get("1").await.unwrap().unwrap();
    assert_eq!(record.category.as_deref(), Some("Tech"));
    assert_eq!(store.tags().await.unwrap(), vec!["rust".to_string()]);
}

#[tokio::test]
async fn test_concurrent_updates_to_different_ids_are_kept() {
    let dir = TempDir::new().unwrap();
    let kv = SqliteKvStore::connect(&database_url(&dir)).await.unwrap();
    let store = MetadataStore::new(Arc::new(kv));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update(&i.to_string(), MetadataPatch::default().with_category(format!("C{i}")))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.get_all().await.unwrap().len(), 20);
}

#[tokio::test]
async fn test_settings_round_trip_through_sqlite() {
    let dir = TempDir::new().unwrap();
    let kv = Arc::new(SqliteKvStore::connect(&database_url(&dir)).await.unwrap());
    let settings_store = SettingsStore::new(kv.clone());

    let settings = Settings {
        api_key: Some("sk-local".to_string()),
        auto_classify: false,
        ..Default::default()
    };
    settings_store.save(&settings).await.unwrap();

    assert_eq!(settings_store.load().await.unwrap(), settings);
    assert!(kv.get("openaiKey").await.unwrap().is_some());
}
