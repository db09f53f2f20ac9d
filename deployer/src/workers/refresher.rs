//! Auto-refresh worker for active deployments

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info};

use crate::store::deployments::DeploymentStore;

/// Refresher worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Refresh interval
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
        }
    }
}

/// Run the refresher worker
pub async fn run<S, F>(
    options: &Options,
    store: &DeploymentStore,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Refresher worker starting...");

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Refresher worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }

        let active = store.active_deployment_ids();
        if active.is_empty() {
            continue;
        }

        debug!("Refreshing {} active deployments", active.len());
        for id in active {
            if store.refresh_deployment(&id).await.is_none() {
                debug!("Deployment {} unknown to the service", id);
            }
        }
    }
}
