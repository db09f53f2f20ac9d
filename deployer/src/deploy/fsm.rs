//! Finite State Machine for deployment status

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Deployment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Created, simulation not yet started
    Pending,

    /// Simulated build in progress
    Building,

    /// Build finished, URL assigned
    Ready,

    /// Build failed
    Error,

    /// Canceled by the user
    Canceled,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::Building => "building",
            DeploymentStatus::Ready => "ready",
            DeploymentStatus::Error => "error",
            DeploymentStatus::Canceled => "canceled",
        }
    }

    /// No automatic transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::Ready | DeploymentStatus::Error | DeploymentStatus::Canceled
        )
    }

    /// Pending or building
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DeploymentStatus::Pending),
            "building" => Ok(DeploymentStatus::Building),
            "ready" => Ok(DeploymentStatus::Ready),
            "error" => Ok(DeploymentStatus::Error),
            "canceled" | "cancelled" => Ok(DeploymentStatus::Canceled),
            _ => Err(DeployError::ValidationError(format!(
                "Invalid deployment status: {}",
                s
            ))),
        }
    }
}

/// Deployment event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentEvent {
    /// Simulation picked the deployment up
    Start,

    /// All build steps completed
    Succeed { url: String, build_time: u32 },

    /// A build step faulted
    Fail(String),

    /// Explicit cancel request
    Cancel,
}

impl DeploymentEvent {
    fn name(&self) -> &'static str {
        match self {
            DeploymentEvent::Start => "start",
            DeploymentEvent::Succeed { .. } => "succeed",
            DeploymentEvent::Fail(_) => "fail",
            DeploymentEvent::Cancel => "cancel",
        }
    }
}

/// Compute the status reached by applying `event` in `state`
pub fn transition(
    state: DeploymentStatus,
    event: &DeploymentEvent,
) -> Result<DeploymentStatus, DeployError> {
    let next = match (state, event) {
        // From Pending
        (DeploymentStatus::Pending, DeploymentEvent::Start) => DeploymentStatus::Building,
        (DeploymentStatus::Pending, DeploymentEvent::Cancel) => DeploymentStatus::Canceled,

        // From Building
        (DeploymentStatus::Building, DeploymentEvent::Succeed { .. }) => DeploymentStatus::Ready,
        (DeploymentStatus::Building, DeploymentEvent::Fail(_)) => DeploymentStatus::Error,
        (DeploymentStatus::Building, DeploymentEvent::Cancel) => DeploymentStatus::Canceled,

        // Invalid transitions
        (state, event) => {
            return Err(DeployError::InvalidTransition {
                from: state.to_string(),
                event: event.name().to_string(),
            });
        }
    };

    Ok(next)
}
