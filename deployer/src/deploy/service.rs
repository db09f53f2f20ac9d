//! Deployment service

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::deploy::build_log::append_log;
use crate::deploy::fsm::DeploymentEvent;
use crate::deploy::registry::DeploymentRegistry;
use crate::deploy::runner::{SimulatedStepRunner, StepRunner};
use crate::deploy::simulator::{DeploymentSimulator, SimulatorSettings};
use crate::deploy::timing::{BuildTiming, RandomTiming};
use crate::errors::DeployError;
use crate::models::deployment::{BuildLogLevel, Deployment, DeploymentRequest};
use crate::utils::{millis_to_datetime, slugify, unique_millis};

pub const CANCEL_MESSAGE: &str = "Deployment canceled by user";

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Sole authority over deployment records and their lifecycle
pub struct DeploymentService {
    registry: Arc<DeploymentRegistry>,
    simulator: Arc<DeploymentSimulator>,
}

impl DeploymentService {
    /// Create a service with randomized simulated timing
    pub fn new(settings: &SimulatorSettings) -> Self {
        let timing: Arc<dyn BuildTiming> = Arc::new(RandomTiming::new(
            settings.step_delay,
            settings.build_time_secs,
        ));
        let runner = Arc::new(SimulatedStepRunner::new(timing.clone()));
        Self::with_strategies(settings.domain.clone(), runner, timing)
    }

    /// Create a service with explicit step runner and timing
    pub fn with_strategies(
        domain: String,
        runner: Arc<dyn StepRunner>,
        timing: Arc<dyn BuildTiming>,
    ) -> Self {
        let registry = Arc::new(DeploymentRegistry::new(UPDATE_CHANNEL_CAPACITY));
        let simulator = Arc::new(DeploymentSimulator::new(
            registry.clone(),
            runner,
            timing,
            domain,
        ));
        Self {
            registry,
            simulator,
        }
    }

    /// Create a pending deployment and start its build in the background
    pub async fn deploy(&self, request: DeploymentRequest) -> Result<Deployment, DeployError> {
        let project_id = request.project_id.trim();
        if project_id.is_empty() {
            return Err(DeployError::ValidationError(
                "projectId must not be empty".to_string(),
            ));
        }

        let stamp = unique_millis();
        let name = match request.name.as_deref() {
            Some(name) => validate_name(name)?,
            None => format!("deployment-{}", stamp),
        };

        let mut deployment = Deployment::new(
            format!("deploy_{}", stamp),
            project_id.to_string(),
            name,
            request.environment.unwrap_or_default(),
            millis_to_datetime(stamp),
        );
        deployment.env_vars = request.env_vars;
        deployment.branch = request.branch;
        deployment.commit_hash = request.commit_hash;

        info!(
            "Created deployment {} ({}) for project {}",
            deployment.id, deployment.name, deployment.project_id
        );
        self.registry.insert(deployment.clone()).await;

        let simulator = self.simulator.clone();
        let id = deployment.id.clone();
        tokio::spawn(async move {
            simulator.run(&id).await;
        });

        Ok(deployment)
    }

    pub async fn get_deployment(&self, id: &str) -> Option<Deployment> {
        self.registry.get(id).await
    }

    /// All deployments of a project, unordered
    pub async fn get_project_deployments(&self, project_id: &str) -> Vec<Deployment> {
        self.registry.list_by_project(project_id).await
    }

    /// Cancel a pending or building deployment.
    ///
    /// Returns whether the deployment was canceled; terminal and unknown
    /// deployments are left untouched.
    pub async fn cancel_deployment(&self, id: &str) -> bool {
        let canceled = self
            .registry
            .update(id, |d| {
                if d.apply(DeploymentEvent::Cancel).is_err() {
                    return false;
                }
                append_log(d, BuildLogLevel::Info, CANCEL_MESSAGE);
                true
            })
            .await
            .unwrap_or(false);

        if canceled {
            info!("Deployment {} canceled", id);
        } else {
            debug!("Cancel of deployment {} ignored", id);
        }
        canceled
    }

    /// Remove a deployment regardless of its status
    pub async fn delete_deployment(&self, id: &str) -> bool {
        let removed = self.registry.remove(id).await.is_some();
        if removed {
            info!("Deployment {} deleted", id);
        }
        removed
    }

    /// Receive a snapshot of every deployment change
    pub fn subscribe(&self) -> broadcast::Receiver<Deployment> {
        self.registry.subscribe()
    }
}

fn validate_name(name: &str) -> Result<String, DeployError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DeployError::ValidationError(
            "deployment name must not be empty".to_string(),
        ));
    }
    if slugify(name).is_empty() {
        return Err(DeployError::ValidationError(format!(
            "deployment name '{}' has no usable characters",
            name
        )));
    }
    Ok(name.to_string())
}
