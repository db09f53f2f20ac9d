//! Server state

use std::sync::Arc;

use crate::store::deployments::DeploymentStore;

/// Server state shared across handlers
pub struct ServerState {
    pub store: Arc<DeploymentStore>,
}

impl ServerState {
    pub fn new(store: Arc<DeploymentStore>) -> Self {
        Self { store }
    }
}
