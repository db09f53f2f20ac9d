//! Client-side deployment store

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::deploy::service::DeploymentService;
use crate::errors::DeployError;
use crate::models::deployment::{sort_by_recency, Deployment, DeploymentRequest, Environment};
use crate::models::provider::DeploymentProvider;
use crate::store::providers::default_providers;
use crate::store::snapshot::StoreSnapshot;
use crate::workers::poller;

pub const DEPLOY_FAILED_MESSAGE: &str = "Failed to deploy project";

#[derive(Debug, Default)]
struct StoreState {
    deployments: Vec<Deployment>,
    providers: Vec<DeploymentProvider>,
    is_deploying: bool,
    error: Option<String>,
}

/// Cached, eventually-consistent view of deployments and providers
pub struct DeploymentStore {
    service: Arc<DeploymentService>,
    state: RwLock<StoreState>,
    poller_options: poller::Options,
    pollers: Mutex<HashMap<String, JoinHandle<()>>>,
    changes: watch::Sender<u64>,
}

impl DeploymentStore {
    /// Create a store seeded with the default providers
    pub fn new(service: Arc<DeploymentService>, poller_options: poller::Options) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            service,
            state: RwLock::new(StoreState {
                providers: default_providers(),
                ..Default::default()
            }),
            poller_options,
            pollers: Mutex::new(HashMap::new()),
            changes,
        }
    }

    /// Request a production deployment and poll it until terminal
    pub async fn deploy_project(
        self: &Arc<Self>,
        project_id: &str,
        name: Option<&str>,
    ) -> Result<Deployment, DeployError> {
        {
            let mut state = self.write_state();
            state.is_deploying = true;
            state.error = None;
        }
        self.notify_change();

        let mut request = DeploymentRequest::new(project_id).with_environment(Environment::Production);
        request.name = name.map(str::to_string);

        let deployment = match self.service.deploy(request).await {
            Ok(deployment) => deployment,
            Err(e) => {
                error!("Failed to deploy project {}: {}", project_id, e);
                {
                    let mut state = self.write_state();
                    state.error = Some(DEPLOY_FAILED_MESSAGE.to_string());
                    state.is_deploying = false;
                }
                self.notify_change();
                return Err(e);
            }
        };

        {
            let mut state = self.write_state();
            state.deployments.push(deployment.clone());
            state.is_deploying = false;
        }
        self.notify_change();

        self.start_polling(&deployment.id);
        Ok(deployment)
    }

    fn start_polling(self: &Arc<Self>, deployment_id: &str) {
        let mut pollers = self.pollers.lock().unwrap_or_else(|e| e.into_inner());

        let store = self.clone();
        let options = self.poller_options.clone();
        let id = deployment_id.to_string();
        let handle = tokio::spawn(async move {
            let outcome = poller::run(&options, store.as_ref(), &id, tokio::time::sleep).await;
            debug!("Poller for deployment {} finished: {:?}", id, outcome);
            store
                .pollers
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&id);
        });

        pollers.insert(deployment_id.to_string(), handle);
    }

    /// Cached deployments of a project, possibly stale between polls
    pub fn get_project_deployments(&self, project_id: &str) -> Vec<Deployment> {
        self.read_state()
            .deployments
            .iter()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect()
    }

    /// Cached deployments of a project, newest first
    pub fn get_project_deployments_by_recency(&self, project_id: &str) -> Vec<Deployment> {
        let mut deployments = self.get_project_deployments(project_id);
        sort_by_recency(&mut deployments);
        deployments
    }

    /// Cached copy of a single deployment
    pub fn get_deployment(&self, deployment_id: &str) -> Option<Deployment> {
        self.read_state()
            .deployments
            .iter()
            .find(|d| d.id == deployment_id)
            .cloned()
    }

    pub fn deployments(&self) -> Vec<Deployment> {
        self.read_state().deployments.clone()
    }

    /// Ids of cached deployments that are still pending or building
    pub fn active_deployment_ids(&self) -> Vec<String> {
        self.read_state()
            .deployments
            .iter()
            .filter(|d| d.status.is_active())
            .map(|d| d.id.clone())
            .collect()
    }

    /// Fetch a deployment from the service and overwrite its cached copy.
    ///
    /// Returns the fetched record, `None` when the service no longer knows it.
    pub async fn refresh_deployment(&self, deployment_id: &str) -> Option<Deployment> {
        let fetched = self.service.get_deployment(deployment_id).await?;
        self.apply_snapshot(fetched.clone());
        Some(fetched)
    }

    /// Overwrite the cached slot with `snapshot` unless the cache already
    /// holds a newer revision. Unknown deployments are not added.
    pub fn apply_snapshot(&self, snapshot: Deployment) -> bool {
        let replaced = {
            let mut state = self.write_state();
            match state.deployments.iter_mut().find(|d| d.id == snapshot.id) {
                Some(cached) if cached.revision <= snapshot.revision && *cached != snapshot => {
                    *cached = snapshot;
                    true
                }
                _ => false,
            }
        };

        if replaced {
            self.notify_change();
        }
        replaced
    }

    /// Cancel through the service, then refresh the cached copy
    pub async fn cancel_deployment(&self, deployment_id: &str) -> Option<Deployment> {
        self.service.cancel_deployment(deployment_id).await;
        self.refresh_deployment(deployment_id).await
    }

    /// Delete through the service and drop the cached copy
    pub async fn delete_deployment(&self, deployment_id: &str) {
        self.service.delete_deployment(deployment_id).await;

        let removed = {
            let mut state = self.write_state();
            let before = state.deployments.len();
            state.deployments.retain(|d| d.id != deployment_id);
            state.deployments.len() != before
        };

        if let Some(handle) = self
            .pollers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(deployment_id)
        {
            handle.abort();
        }

        if removed {
            self.notify_change();
        }
    }

    pub fn providers(&self) -> Vec<DeploymentProvider> {
        self.read_state().providers.clone()
    }

    pub fn connected_providers(&self) -> Vec<DeploymentProvider> {
        self.read_state()
            .providers
            .iter()
            .filter(|p| p.is_connected)
            .cloned()
            .collect()
    }

    /// Mark a provider connected with the given config
    pub fn connect_provider(&self, provider_id: &str, config: Map<String, Value>) -> bool {
        let found = self.update_provider(provider_id, |p| {
            p.is_connected = true;
            p.config = Some(config);
        });
        if found {
            info!("Provider {} connected", provider_id);
        }
        found
    }

    /// Mark a provider disconnected and drop its config
    pub fn disconnect_provider(&self, provider_id: &str) -> bool {
        let found = self.update_provider(provider_id, |p| {
            p.is_connected = false;
            p.config = None;
        });
        if found {
            info!("Provider {} disconnected", provider_id);
        }
        found
    }

    fn update_provider(&self, provider_id: &str, f: impl FnOnce(&mut DeploymentProvider)) -> bool {
        let found = {
            let mut state = self.write_state();
            match state.providers.iter_mut().find(|p| p.id == provider_id) {
                Some(provider) => {
                    f(provider);
                    true
                }
                None => false,
            }
        };

        if found {
            self.notify_change();
        } else {
            debug!("Unknown provider {}", provider_id);
        }
        found
    }

    pub fn is_deploying(&self) -> bool {
        self.read_state().is_deploying
    }

    pub fn error(&self) -> Option<String> {
        self.read_state().error.clone()
    }

    /// Capture the persisted part of the store
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read_state();
        StoreSnapshot {
            deployments: state.deployments.clone(),
            providers: state.providers.clone(),
        }
    }

    /// Load a previously captured snapshot.
    ///
    /// Deployments are replaced wholesale. Providers stay the seeded set;
    /// only connection flags and config of known ids are taken over.
    pub fn restore(&self, snapshot: StoreSnapshot) {
        {
            let mut state = self.write_state();
            state.deployments = snapshot.deployments;

            for stored in snapshot.providers {
                if let Some(provider) = state.providers.iter_mut().find(|p| p.id == stored.id) {
                    provider.is_connected = stored.is_connected;
                    provider.config = stored.config;
                }
            }
        }
        self.notify_change();
    }

    /// Watch a counter bumped on every cache change
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Stop all deploy pollers
    pub fn shutdown(&self) {
        let mut pollers = self.pollers.lock().unwrap_or_else(|e| e.into_inner());
        for (_, handle) in pollers.drain() {
            handle.abort();
        }
    }

    fn notify_change(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
