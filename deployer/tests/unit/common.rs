//! Shared test fixtures

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kebulan::deploy::runner::{SimulatedStepRunner, StepRunner};
use kebulan::deploy::service::DeploymentService;
use kebulan::deploy::timing::{BuildTiming, FixedTiming};
use kebulan::errors::DeployError;
use kebulan::models::deployment::Deployment;
use kebulan::store::deployments::DeploymentStore;
use kebulan::workers::poller;
use tokio::sync::Semaphore;

pub const DOMAIN: &str = "kebulan-apps.com";

/// Service whose steps complete immediately
pub fn instant_service() -> Arc<DeploymentService> {
    let timing: Arc<dyn BuildTiming> = Arc::new(FixedTiming::instant());
    service_with_runner(Arc::new(SimulatedStepRunner::new(timing.clone())), timing)
}

pub fn service_with_runner(
    runner: Arc<dyn StepRunner>,
    timing: Arc<dyn BuildTiming>,
) -> Arc<DeploymentService> {
    Arc::new(DeploymentService::with_strategies(
        DOMAIN.to_string(),
        runner,
        timing,
    ))
}

pub fn store_for(service: Arc<DeploymentService>, poll_interval: Duration) -> Arc<DeploymentStore> {
    Arc::new(DeploymentStore::new(
        service,
        poller::Options {
            interval: poll_interval,
        },
    ))
}

/// Wait until the service reports a terminal status
pub async fn wait_terminal(service: &DeploymentService, id: &str) -> Deployment {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(deployment) = service.get_deployment(id).await {
                if deployment.is_terminal() {
                    return deployment;
                }
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("deployment did not finish in time")
}

/// Wait until the store's cached copy is terminal
pub async fn wait_cached_terminal(store: &DeploymentStore, id: &str) -> Deployment {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(deployment) = store.get_deployment(id) {
                if deployment.is_terminal() {
                    return deployment;
                }
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("cached deployment did not finish in time")
}

/// Fails the step at `fail_at`
pub struct FailingRunner {
    pub fail_at: usize,
}

#[async_trait]
impl StepRunner for FailingRunner {
    async fn run_step(&self, _id: &str, index: usize, _step: &str) -> Result<(), DeployError> {
        if index == self.fail_at {
            return Err(DeployError::StepFailed("disk full".to_string()));
        }
        Ok(())
    }
}

/// Panics on the first step
pub struct PanickingRunner;

#[async_trait]
impl StepRunner for PanickingRunner {
    async fn run_step(&self, _id: &str, _index: usize, _step: &str) -> Result<(), DeployError> {
        panic!("kaboom");
    }
}

/// Lets the first step through, then blocks every step on a permit
pub struct GatedRunner {
    pub gate: Arc<Semaphore>,
}

#[async_trait]
impl StepRunner for GatedRunner {
    async fn run_step(&self, _id: &str, index: usize, _step: &str) -> Result<(), DeployError> {
        if index > 0 {
            self.gate
                .acquire()
                .await
                .map_err(|e| DeployError::Internal(e.to_string()))?
                .forget();
        }
        Ok(())
    }
}
