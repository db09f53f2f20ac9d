//! Snapshot persistence worker

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{error, info};

use crate::storage::snapshot::SnapshotFile;
use crate::store::deployments::DeploymentStore;

/// Persister worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Quiet period after a change before writing
    pub debounce: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
        }
    }
}

/// Run the persister worker. Writes a final snapshot on shutdown.
pub async fn run<S, F>(
    options: &Options,
    store: &DeploymentStore,
    snapshot_file: &SnapshotFile,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Persister worker starting...");

    let mut changes = store.subscribe_changes();
    changes.mark_unchanged();

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Persister worker shutting down...");
                save(store, snapshot_file).await;
                return;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    save(store, snapshot_file).await;
                    return;
                }
            }
        }

        sleep_fn(options.debounce).await;
        changes.mark_unchanged();
        save(store, snapshot_file).await;
    }
}

async fn save(store: &DeploymentStore, snapshot_file: &SnapshotFile) {
    if let Err(e) = snapshot_file.save(&store.snapshot()).await {
        error!("Failed to persist deployment snapshot: {}", e);
    }
}
