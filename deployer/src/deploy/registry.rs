//! Authoritative deployment record map

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};

use crate::models::deployment::Deployment;

/// Owns the canonical deployment records and publishes every change
pub struct DeploymentRegistry {
    records: RwLock<HashMap<String, Deployment>>,
    updates: broadcast::Sender<Deployment>,
}

impl DeploymentRegistry {
    pub fn new(update_capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(update_capacity.max(1));
        Self {
            records: RwLock::new(HashMap::new()),
            updates,
        }
    }

    pub async fn insert(&self, deployment: Deployment) {
        let snapshot = deployment.clone();
        self.records
            .write()
            .await
            .insert(deployment.id.clone(), deployment);
        self.publish(snapshot);
    }

    pub async fn get(&self, id: &str) -> Option<Deployment> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn list_by_project(&self, project_id: &str) -> Vec<Deployment> {
        self.records
            .read()
            .await
            .values()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect()
    }

    /// Mutate a record under the write lock.
    ///
    /// Returns `None` when the id is unknown. A snapshot is published when
    /// the closure changed the record's revision.
    pub async fn update<R>(&self, id: &str, f: impl FnOnce(&mut Deployment) -> R) -> Option<R> {
        let mut records = self.records.write().await;
        let deployment = records.get_mut(id)?;

        let revision = deployment.revision;
        let result = f(deployment);
        if deployment.revision != revision {
            self.publish(deployment.clone());
        }

        Some(result)
    }

    pub async fn remove(&self, id: &str) -> Option<Deployment> {
        self.records.write().await.remove(id)
    }

    /// Receive a snapshot after every change
    pub fn subscribe(&self) -> broadcast::Receiver<Deployment> {
        self.updates.subscribe()
    }

    fn publish(&self, snapshot: Deployment) {
        // no subscribers is fine
        let _ = self.updates.send(snapshot);
    }
}
