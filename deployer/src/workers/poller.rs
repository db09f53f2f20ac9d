//! Per-deployment status poller

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::deploy::fsm::DeploymentStatus;
use crate::store::deployments::DeploymentStore;

/// Poller options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay between two fetches
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
        }
    }
}

/// Why a poller stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The deployment reached a terminal status
    Terminal(DeploymentStatus),

    /// The service no longer knows the deployment
    Missing,
}

/// Re-fetch a deployment on every interval until it is terminal
pub async fn run<S, F>(
    options: &Options,
    store: &DeploymentStore,
    deployment_id: &str,
    sleep_fn: S,
) -> PollOutcome
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    debug!("Polling deployment {} every {:?}", deployment_id, options.interval);

    loop {
        sleep_fn(options.interval).await;

        match store.refresh_deployment(deployment_id).await {
            Some(deployment) if deployment.status.is_terminal() => {
                debug!(
                    "Deployment {} reached {}, polling stopped",
                    deployment_id, deployment.status
                );
                return PollOutcome::Terminal(deployment.status);
            }
            Some(deployment) => {
                debug!(
                    "Deployment {} still {} ({} logs)",
                    deployment_id,
                    deployment.status,
                    deployment.build_logs.len()
                );
            }
            None => {
                debug!("Deployment {} disappeared, polling stopped", deployment_id);
                return PollOutcome::Missing;
            }
        }
    }
}
