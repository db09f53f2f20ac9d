//! Serializable store snapshots

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;
use crate::models::deployment::Deployment;
use crate::models::provider::DeploymentProvider;

/// The persisted part of the deployment store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub deployments: Vec<Deployment>,

    #[serde(default)]
    pub providers: Vec<DeploymentProvider>,
}

/// Serialize a snapshot to JSON bytes
pub fn encode_snapshot(snapshot: &StoreSnapshot) -> Result<Vec<u8>, DeployError> {
    Ok(serde_json::to_vec_pretty(snapshot)?)
}

/// Parse a snapshot from JSON bytes
pub fn decode_snapshot(bytes: &[u8]) -> Result<StoreSnapshot, DeployError> {
    Ok(serde_json::from_slice(bytes)?)
}
