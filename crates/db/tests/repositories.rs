//! Integration tests for the connector and group repositories.
//!
//! Exercises the repository layer against the in-memory backend:
//! - Connector save/find round-trip and idempotent upsert
//! - Group index maintenance
//! - Purge of connector state
//! - Result slot only written by valid runs

use intools_core::{Connector, ContainerConfig, Executor};
use intools_db::repositories::{ConnectorRepo, GroupRepo};
use intools_db::{keys, MemoryStore, Store};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn connector(group: &str, name: &str) -> Connector {
    Connector::new(
        group,
        name,
        ContainerConfig::new("alpine:3.19", vec!["echo".into(), "{}".into()]),
    )
    .with_refresh(10)
}

fn valid_executor(payload: serde_json::Value) -> Executor {
    Executor {
        container_id: "0123456789ab".into(),
        terminated: true,
        valid: true,
        json_stdout: payload.as_object().cloned(),
        stdout: payload.to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Test: connector round-trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn saved_connector_reads_back_equal() {
    let store = MemoryStore::new();
    let mut c = connector("ops", "disk");
    c.config
        .extra
        .insert("Env".into(), serde_json::json!(["LEVEL=2"]));

    ConnectorRepo::save(&store, &c).await.unwrap();

    let loaded = ConnectorRepo::find(&store, "ops", "disk").await.unwrap();
    assert_eq!(loaded, Some(c));
}

#[tokio::test]
async fn saving_twice_keeps_single_index_entries() {
    let store = MemoryStore::new();
    let c = connector("ops", "disk");

    ConnectorRepo::save(&store, &c).await.unwrap();
    ConnectorRepo::save(&store, &c).await.unwrap();

    assert_eq!(
        ConnectorRepo::list_names(&store, "ops").await.unwrap(),
        vec!["disk"]
    );
    assert_eq!(GroupRepo::list(&store).await.unwrap(), vec!["ops"]);
}

#[tokio::test]
async fn list_skips_unreadable_definitions() {
    let store = MemoryStore::new();
    ConnectorRepo::save(&store, &connector("ops", "good")).await.unwrap();
    ConnectorRepo::save(&store, &connector("ops", "bad")).await.unwrap();
    store
        .set(&keys::connector_conf("ops", "bad"), "{not json")
        .await
        .unwrap();

    let listed = ConnectorRepo::list(&store, "ops").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "good");
}

// ---------------------------------------------------------------------------
// Test: groups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_group_is_idempotent() {
    let store = MemoryStore::new();

    assert!(GroupRepo::create(&store, "ops").await.unwrap());
    assert!(!GroupRepo::create(&store, "ops").await.unwrap());

    assert_eq!(GroupRepo::list(&store).await.unwrap(), vec!["ops"]);
    assert_eq!(GroupRepo::count(&store).await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_creates_report_a_single_winner() {
    let store = std::sync::Arc::new(MemoryStore::new());

    let creates: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { GroupRepo::create(store.as_ref(), "ops").await })
        })
        .collect();
    let mut created = 0;
    for create in creates {
        if create.await.unwrap().unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(GroupRepo::count(store.as_ref()).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_group_drops_index_entries() {
    let store = MemoryStore::new();
    ConnectorRepo::save(&store, &connector("ops", "disk")).await.unwrap();
    GroupRepo::create(&store, "web").await.unwrap();

    GroupRepo::delete(&store, "ops").await.unwrap();

    assert_eq!(GroupRepo::list(&store).await.unwrap(), vec!["web"]);
    assert!(ConnectorRepo::list_names(&store, "ops")
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Test: executor and result slots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remove_purges_every_connector_key() {
    let store = MemoryStore::new();
    let c = connector("ops", "disk");
    ConnectorRepo::save(&store, &c).await.unwrap();
    ConnectorRepo::save_executor(&store, "ops", "disk", &valid_executor(serde_json::json!({"ok": true})))
        .await
        .unwrap();

    ConnectorRepo::remove(&store, "ops", "disk").await.unwrap();

    assert!(ConnectorRepo::find(&store, "ops", "disk").await.unwrap().is_none());
    assert!(ConnectorRepo::find_executor(&store, "ops", "disk")
        .await
        .unwrap()
        .is_none());
    assert!(ConnectorRepo::find_result(&store, "ops", "disk")
        .await
        .unwrap()
        .is_none());
    // Only the group index survives.
    assert_eq!(store.key_count().await, 1);
}

#[tokio::test]
async fn invalid_run_keeps_previous_result() {
    let store = MemoryStore::new();
    ConnectorRepo::save_executor(&store, "ops", "disk", &valid_executor(serde_json::json!({"used": 42})))
        .await
        .unwrap();

    let failed = Executor {
        container_id: "fedcba987654".into(),
        valid: false,
        ..Default::default()
    };
    ConnectorRepo::save_executor(&store, "ops", "disk", &failed)
        .await
        .unwrap();

    let last = ConnectorRepo::find_executor(&store, "ops", "disk")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.container_id, "fedcba987654");

    let result = ConnectorRepo::find_result(&store, "ops", "disk")
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(result["used"], 42);
}

#[tokio::test]
async fn valid_run_with_plain_stdout_stores_null_result() {
    let store = MemoryStore::new();
    let exec = Executor {
        valid: true,
        stdout: "not json".into(),
        ..Default::default()
    };
    ConnectorRepo::save_executor(&store, "ops", "disk", &exec)
        .await
        .unwrap();

    let result = ConnectorRepo::find_result(&store, "ops", "disk")
        .await
        .unwrap();
    assert_eq!(result, Some(None));
}
