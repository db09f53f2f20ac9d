//! Deployment models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deploy::fsm::{transition, DeploymentEvent, DeploymentStatus};
use crate::errors::DeployError;

/// Target environment of a deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Preview,
}

/// Severity of a build log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildLogLevel {
    Info,
    Warn,
    Error,
}

impl BuildLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildLogLevel::Info => "info",
            BuildLogLevel::Warn => "warn",
            BuildLogLevel::Error => "error",
        }
    }
}

/// One emitted build-process line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: BuildLogLevel,
    pub message: String,
}

/// A deployment request issued by a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub project_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub environment: Option<Environment>,

    /// Carried for the hosting provider, never interpreted here
    #[serde(default)]
    pub env_vars: Option<HashMap<String, String>>,

    #[serde(default)]
    pub branch: Option<String>,

    #[serde(default)]
    pub commit_hash: Option<String>,
}

impl DeploymentRequest {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }
}

/// One build/release attempt for a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub project_id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub status: DeploymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub build_logs: Vec<BuildLog>,

    pub environment: Environment,

    /// Copied from the request for the hosting provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<HashMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,

    /// Seconds, set once the deployment is ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_time: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Bumped on every mutation, lets caches drop stale snapshots
    #[serde(default)]
    pub revision: u64,
}

impl Deployment {
    /// Create a pending deployment
    pub fn new(
        id: String,
        project_id: String,
        name: String,
        environment: Environment,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            project_id,
            name,
            url: None,
            status: DeploymentStatus::Pending,
            created_at,
            updated_at: created_at,
            build_logs: Vec::new(),
            environment,
            env_vars: None,
            branch: None,
            commit_hash: None,
            build_time: None,
            error: None,
            revision: 0,
        }
    }

    /// Apply a lifecycle event, filling the fields its target status owns
    pub fn apply(&mut self, event: DeploymentEvent) -> Result<(), DeployError> {
        let next = transition(self.status, &event)?;

        match event {
            DeploymentEvent::Succeed { url, build_time } => {
                self.url = Some(url);
                self.build_time = Some(build_time);
            }
            DeploymentEvent::Fail(message) => {
                self.error = Some(message);
            }
            DeploymentEvent::Start | DeploymentEvent::Cancel => {}
        }

        self.status = next;
        self.touch();
        Ok(())
    }

    pub(crate) fn touch(&mut self) {
        // created_at may run a few millis ahead of the clock
        self.updated_at = Utc::now().max(self.updated_at);
        self.revision += 1;
    }

    /// Estimated completion percentage for progress displays
    pub fn progress_percent(&self) -> u8 {
        match self.status {
            DeploymentStatus::Pending => 10,
            DeploymentStatus::Building => {
                let estimate = 20 + self.build_logs.len().saturating_mul(10);
                estimate.min(90) as u8
            }
            DeploymentStatus::Ready => 100,
            DeploymentStatus::Error | DeploymentStatus::Canceled => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Sort deployments newest first
pub fn sort_by_recency(deployments: &mut [Deployment]) {
    deployments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
