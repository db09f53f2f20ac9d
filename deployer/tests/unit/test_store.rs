//! Deployment store tests

use std::time::Duration;

use kebulan::deploy::fsm::DeploymentStatus;
use kebulan::errors::DeployError;
use kebulan::models::deployment::DeploymentRequest;
use kebulan::store::deployments::DEPLOY_FAILED_MESSAGE;
use kebulan::store::snapshot::StoreSnapshot;
use serde_json::{json, Map, Value};
use tokio_test::assert_ok;

use crate::common::{instant_service, store_for, wait_cached_terminal, wait_terminal};

const POLL: Duration = Duration::from_millis(5);

fn config(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[tokio::test]
async fn test_deploy_project_polls_to_ready() {
    let store = store_for(instant_service(), POLL);

    let created = assert_ok!(store.deploy_project("p1", Some("my-app")).await);

    assert_eq!(created.status, DeploymentStatus::Pending);
    assert!(!store.is_deploying());
    assert!(store.error().is_none());
    assert_eq!(store.get_project_deployments("p1").len(), 1);

    let cached = wait_cached_terminal(&store, &created.id).await;
    assert_eq!(cached.status, DeploymentStatus::Ready);
    assert!(cached.url.is_some());
    assert!(store.active_deployment_ids().is_empty());
}

#[tokio::test]
async fn test_deploy_project_failure_sets_error() {
    let store = store_for(instant_service(), POLL);

    let result = store.deploy_project("p1", Some("   ")).await;

    assert!(matches!(result, Err(DeployError::ValidationError(_))));
    assert_eq!(store.error().as_deref(), Some(DEPLOY_FAILED_MESSAGE));
    assert!(!store.is_deploying());
    assert!(store.deployments().is_empty());

    // A later success clears the error
    assert_ok!(store.deploy_project("p1", Some("fixed")).await);
    assert!(store.error().is_none());
}

#[tokio::test]
async fn test_project_views() {
    let store = store_for(instant_service(), POLL);
    let first = assert_ok!(store.deploy_project("p1", Some("first")).await);
    let second = assert_ok!(store.deploy_project("p1", Some("second")).await);
    assert_ok!(store.deploy_project("p2", Some("other")).await);

    assert_eq!(store.get_project_deployments("p1").len(), 2);
    assert_eq!(store.get_project_deployments("p2").len(), 1);

    let by_recency: Vec<String> = store
        .get_project_deployments_by_recency("p1")
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(by_recency, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_cancel_through_store() {
    let store = store_for(instant_service(), Duration::from_secs(3600));
    let created = assert_ok!(store.deploy_project("p1", Some("stop-me")).await);

    let canceled = store.cancel_deployment(&created.id).await.unwrap();

    assert_eq!(canceled.status, DeploymentStatus::Canceled);
    assert_eq!(
        store.get_deployment(&created.id).map(|d| d.status),
        Some(DeploymentStatus::Canceled)
    );
    assert!(store.cancel_deployment("deploy_unknown").await.is_none());
}

#[tokio::test]
async fn test_delete_through_store() {
    let service = instant_service();
    let store = store_for(service.clone(), POLL);
    let created = assert_ok!(store.deploy_project("p1", Some("bye")).await);

    store.delete_deployment(&created.id).await;

    assert!(store.get_deployment(&created.id).is_none());
    assert!(service.get_deployment(&created.id).await.is_none());

    // Unknown ids are ignored
    store.delete_deployment("deploy_unknown").await;
}

#[tokio::test]
async fn test_refresh_does_not_add_unknown() {
    let service = instant_service();
    let store = store_for(service.clone(), POLL);
    let created = assert_ok!(service.deploy(DeploymentRequest::new("p1")).await);

    let fetched = store.refresh_deployment(&created.id).await;

    assert!(fetched.is_some());
    assert!(store.get_deployment(&created.id).is_none());
    assert!(store.refresh_deployment("deploy_unknown").await.is_none());
}

#[tokio::test]
async fn test_apply_snapshot_ignores_stale_revision() {
    let service = instant_service();
    let store = store_for(service.clone(), Duration::from_secs(3600));
    let created = assert_ok!(store.deploy_project("p1", Some("rev")).await);
    let ready = wait_terminal(&service, &created.id).await;

    assert!(store.apply_snapshot(ready.clone()));
    assert!(!store.apply_snapshot(created.clone()));
    assert!(!store.apply_snapshot(ready.clone()));

    assert_eq!(store.get_deployment(&created.id), Some(ready));
}

#[tokio::test]
async fn test_provider_connection() {
    let store = store_for(instant_service(), POLL);

    let connected: Vec<String> = store.connected_providers().into_iter().map(|p| p.id).collect();
    assert_eq!(connected, vec!["vercel".to_string()]);

    assert!(store.connect_provider("netlify", config(json!({"token": "abc"}))));
    let netlify = store
        .providers()
        .into_iter()
        .find(|p| p.id == "netlify")
        .unwrap();
    assert!(netlify.is_connected);
    assert_eq!(netlify.config.unwrap().get("token"), Some(&json!("abc")));

    assert!(store.disconnect_provider("netlify"));
    assert!(store.disconnect_provider("vercel"));
    assert!(store.connected_providers().is_empty());

    assert!(!store.connect_provider("heroku", Map::new()));
    assert!(!store.disconnect_provider("heroku"));
    assert_eq!(store.providers().len(), 3);
}

#[tokio::test]
async fn test_snapshot_restore() {
    let store = store_for(instant_service(), Duration::from_secs(3600));
    let created = assert_ok!(store.deploy_project("p1", Some("kept")).await);
    store.connect_provider("github-pages", config(json!({"repo": "me/site"})));

    let mut snapshot = store.snapshot();
    snapshot.providers.push(
        kebulan::models::provider::DeploymentProvider::new("heroku", "Heroku", "H", "Unknown")
            .connected(),
    );

    let restored = store_for(instant_service(), POLL);
    restored.restore(snapshot);

    assert_eq!(restored.get_deployment(&created.id), Some(created));
    assert_eq!(restored.providers().len(), 3);
    let connected: Vec<String> = restored
        .connected_providers()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(connected, vec!["vercel".to_string(), "github-pages".to_string()]);

    restored.restore(StoreSnapshot::default());
    assert!(restored.deployments().is_empty());
    assert_eq!(restored.connected_providers().len(), 2);
}

#[tokio::test]
async fn test_changes_are_signalled() {
    let store = store_for(instant_service(), POLL);
    let mut changes = store.subscribe_changes();
    changes.mark_unchanged();

    store.disconnect_provider("vercel");

    assert!(changes.has_changed().unwrap());
}
