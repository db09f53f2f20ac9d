//! Poller, refresher and update listener tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kebulan::deploy::fsm::DeploymentStatus;
use kebulan::models::deployment::DeploymentRequest;
use kebulan::store::snapshot::StoreSnapshot;
use kebulan::workers::poller::{self, PollOutcome};
use kebulan::workers::{listener, refresher};
use tokio::sync::{broadcast, oneshot};
use tokio_test::assert_ok;

use crate::common::{instant_service, store_for, wait_cached_terminal, wait_terminal};

const IDLE: Duration = Duration::from_secs(3600);

#[tokio::test]
async fn test_poller_stops_at_terminal() {
    let service = instant_service();
    let store = store_for(service.clone(), IDLE);
    let created = assert_ok!(store.deploy_project("p1", Some("polled")).await);

    let ticks = AtomicUsize::new(0);
    let options = poller::Options {
        interval: Duration::from_millis(1),
    };
    let outcome = poller::run(&options, store.as_ref(), &created.id, |d| {
        ticks.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(d)
    })
    .await;

    assert_eq!(outcome, PollOutcome::Terminal(DeploymentStatus::Ready));
    assert!(ticks.load(Ordering::SeqCst) >= 1);
    assert_eq!(
        store.get_deployment(&created.id).map(|d| d.status),
        Some(DeploymentStatus::Ready)
    );
}

#[tokio::test]
async fn test_poller_stops_when_missing() {
    let service = instant_service();
    let store = store_for(service.clone(), IDLE);
    let created = assert_ok!(store.deploy_project("p1", Some("vanishing")).await);
    service.delete_deployment(&created.id).await;

    let options = poller::Options {
        interval: Duration::ZERO,
    };
    let outcome = poller::run(&options, store.as_ref(), &created.id, tokio::time::sleep).await;

    assert_eq!(outcome, PollOutcome::Missing);
}

#[tokio::test]
async fn test_refresher_updates_active_deployments() {
    let service = instant_service();
    let store = store_for(service.clone(), IDLE);
    let created = assert_ok!(service.deploy(DeploymentRequest::new("p1")).await);
    store.restore(StoreSnapshot {
        deployments: vec![created.clone()],
        providers: vec![],
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let worker_store = store.clone();
    let handle = tokio::spawn(async move {
        refresher::run(
            &refresher::Options {
                interval: Duration::from_millis(2),
            },
            worker_store.as_ref(),
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.await;
            }),
        )
        .await;
    });

    let cached = wait_cached_terminal(&store, &created.id).await;
    assert_eq!(cached.status, DeploymentStatus::Ready);

    let _ = shutdown_tx.send(());
    assert_ok!(tokio::time::timeout(Duration::from_secs(1), handle).await);
}

#[tokio::test]
async fn test_listener_applies_pushed_updates() {
    let service = instant_service();
    let store = store_for(service.clone(), IDLE);
    let updates = service.subscribe();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let worker_store = store.clone();
    let handle = tokio::spawn(async move {
        listener::run(
            worker_store.as_ref(),
            updates,
            Box::pin(async move {
                let _ = shutdown_rx.await;
            }),
        )
        .await;
    });

    let created = assert_ok!(store.deploy_project("p1", Some("pushed")).await);

    // Polling is idle, so only pushed snapshots can finish the cached copy
    let cached = wait_cached_terminal(&store, &created.id).await;
    assert_eq!(cached.status, DeploymentStatus::Ready);
    assert!(!cached.build_logs.is_empty());

    let _ = shutdown_tx.send(());
    assert_ok!(tokio::time::timeout(Duration::from_secs(1), handle).await);
}

#[tokio::test]
async fn test_listener_stops_when_service_dropped() {
    let service = instant_service();
    let store = store_for(Arc::clone(&service), IDLE);
    let updates = service.subscribe();
    drop(store);
    drop(service);

    let store = store_for(instant_service(), IDLE);
    let result = tokio::time::timeout(
        Duration::from_secs(1),
        listener::run(store.as_ref(), updates, Box::pin(std::future::pending())),
    )
    .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_listener_refreshes_after_lag() {
    let service = instant_service();
    let store = store_for(service.clone(), IDLE);
    let created = assert_ok!(service.deploy(DeploymentRequest::new("p1")).await);
    store.restore(StoreSnapshot {
        deployments: vec![created.clone()],
        providers: vec![],
    });
    let ready = wait_terminal(&service, &created.id).await;

    // Overflow a single-slot channel so the first receive reports a lag
    let (tx, rx) = broadcast::channel(1);
    tx.send(created.clone()).unwrap();
    tx.send(created.clone()).unwrap();
    drop(tx);

    let result = tokio::time::timeout(
        Duration::from_secs(1),
        listener::run(store.as_ref(), rx, Box::pin(std::future::pending())),
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(store.get_deployment(&created.id), Some(ready));
}
