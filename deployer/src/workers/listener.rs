//! Applies pushed deployment updates to the store

use std::future::Future;
use std::pin::Pin;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::models::deployment::Deployment;
use crate::store::deployments::DeploymentStore;

/// Run the update listener worker
pub async fn run(
    store: &DeploymentStore,
    mut updates: broadcast::Receiver<Deployment>,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    info!("Update listener starting...");

    loop {
        let update = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Update listener shutting down...");
                return;
            }
            update = updates.recv() => update,
        };

        match update {
            Ok(deployment) => {
                if store.apply_snapshot(deployment) {
                    debug!("Applied pushed deployment update");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Update listener lagged by {} updates, refreshing active deployments", skipped);
                for id in store.active_deployment_ids() {
                    store.refresh_deployment(&id).await;
                }
            }
            Err(RecvError::Closed) => {
                info!("Update channel closed, listener stopping");
                return;
            }
        }
    }
}
