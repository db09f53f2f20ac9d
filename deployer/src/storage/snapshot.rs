//! Store snapshot persistence

use tracing::{debug, warn};

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::store::snapshot::{decode_snapshot, encode_snapshot, StoreSnapshot};

/// Snapshot of the deployment store kept in a single JSON file
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    file: File,
}

impl SnapshotFile {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Load the stored snapshot.
    ///
    /// A missing file yields `None`; an unreadable one is reported as a
    /// persistence error.
    pub async fn load(&self) -> Result<Option<StoreSnapshot>, DeployError> {
        if !self.file.exists().await {
            debug!("No snapshot at {}", self.file.path().display());
            return Ok(None);
        }

        let bytes = self.file.read_bytes().await?;
        decode_snapshot(&bytes).map(Some).map_err(|e| {
            warn!("Corrupt snapshot {}: {}", self.file.path().display(), e);
            DeployError::PersistenceError(e.to_string())
        })
    }

    pub async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), DeployError> {
        let bytes = encode_snapshot(snapshot)?;
        self.file.write_atomic(&bytes).await?;
        debug!(
            "Saved snapshot with {} deployments to {}",
            snapshot.deployments.len(),
            self.file.path().display()
        );
        Ok(())
    }
}
