//! Snapshot persistence and settings tests

use std::time::Duration;

use kebulan::errors::DeployError;
use kebulan::filesys::file::File;
use kebulan::storage::settings::Settings;
use kebulan::storage::snapshot::SnapshotFile;
use kebulan::workers::persister;
use serde_json::Map;
use tokio::sync::oneshot;
use tokio_test::assert_ok;

use crate::common::{instant_service, store_for};

#[tokio::test]
async fn test_persister_saves_changes_and_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_file = SnapshotFile::new(File::new(dir.path().join("deployments.json")));
    let store = store_for(instant_service(), Duration::from_secs(3600));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let worker_store = store.clone();
    let worker_file = snapshot_file.clone();
    let handle = tokio::spawn(async move {
        persister::run(
            &persister::Options {
                debounce: Duration::from_millis(1),
            },
            worker_store.as_ref(),
            &worker_file,
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.await;
            }),
        )
        .await;
    });

    // Let the worker subscribe before the first change
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(store.connect_provider("netlify", Map::new()));

    let saved = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(Some(snapshot)) = snapshot_file.load().await {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();
    assert!(saved
        .providers
        .iter()
        .any(|p| p.id == "netlify" && p.is_connected));

    // The final write on shutdown captures later changes
    let created = assert_ok!(store.deploy_project("p1", Some("persisted")).await);
    let _ = shutdown_tx.send(());
    assert_ok!(handle.await);

    let saved = snapshot_file.load().await.unwrap().unwrap();
    assert!(saved.deployments.iter().any(|d| d.id == created.id));

    let restored = store_for(instant_service(), Duration::from_secs(3600));
    restored.restore(saved);
    assert!(restored.get_deployment(&created.id).is_some());
    assert_eq!(restored.connected_providers().len(), 2);
}

#[tokio::test]
async fn test_settings_file_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    tokio::fs::write(
        &path,
        br#"{"domain": "example.dev", "store": {"poll_interval_ms": 250}}"#,
    )
    .await
    .unwrap();

    let settings = assert_ok!(Settings::load(&File::new(&path)).await);

    assert_eq!(settings.domain, "example.dev");
    assert_eq!(settings.store.poll_interval_ms, 250);
    assert_eq!(settings.store.refresh_interval_ms, 3000);
    assert_eq!(settings.simulator.build_time_min_secs, 30);
}

#[tokio::test]
async fn test_settings_written_by_init_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("conf/settings.json"));

    assert_ok!(file.write_json(&Settings::default()).await);
    let settings = assert_ok!(Settings::load(&file).await);

    assert_eq!(settings.server.port, 8787);
    assert!(settings.persist_snapshots);
}

#[tokio::test]
async fn test_settings_reject_build_time_outside_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    tokio::fs::write(
        &path,
        br#"{"simulator": {"build_time_min_secs": 5, "build_time_max_secs": 5}}"#,
    )
    .await
    .unwrap();

    let result = Settings::load(&File::new(&path)).await;

    assert!(matches!(result, Err(DeployError::ConfigError(_))));
}
