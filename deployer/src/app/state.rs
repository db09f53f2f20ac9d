//! Application state management

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::options::AppOptions;
use crate::deploy::service::DeploymentService;
use crate::errors::DeployError;
use crate::storage::snapshot::SnapshotFile;
use crate::store::deployments::DeploymentStore;

/// Main application state, built once by the composition root
pub struct AppState {
    /// Authoritative deployment records
    pub service: Arc<DeploymentService>,

    /// Client-side cache
    pub store: Arc<DeploymentStore>,

    /// Persisted store snapshot
    pub snapshot_file: Arc<SnapshotFile>,
}

impl AppState {
    /// Initialize application state, restoring the last snapshot if enabled
    pub async fn init(options: &AppOptions) -> Result<Self, DeployError> {
        info!("Initializing application state...");

        let service = Arc::new(DeploymentService::new(&options.simulator));
        let store = Arc::new(DeploymentStore::new(
            service.clone(),
            options.poller.clone(),
        ));
        let snapshot_file = Arc::new(SnapshotFile::new(options.layout.snapshot_file()));

        if options.persist_snapshots {
            match snapshot_file.load().await {
                Ok(Some(snapshot)) => {
                    info!(
                        "Restoring {} deployments from {}",
                        snapshot.deployments.len(),
                        snapshot_file.file().path().display()
                    );
                    store.restore(snapshot);
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring unreadable snapshot: {}", e),
            }
        }

        Ok(Self {
            service,
            store,
            snapshot_file,
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), DeployError> {
        info!("Shutting down application state...");
        self.store.shutdown();
        Ok(())
    }
}
